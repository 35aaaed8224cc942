//! Cache Manager (C5): composes Tier-1/2/3 behind a single get/set
//! interface, implementing the tiering protocol of §4.5.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CacheError;
use crate::keys::{FieldFingerprint, RequestFingerprint};
use crate::model::{CachedResult, FieldValue, Schema};

use super::tier1::{Tier1Cache, L1_MAX};
use super::tier2::Tier2Cache;
use super::tier3::Tier3Cache;

/// Which tier satisfied a `get`, or that the hit was a Tier-3 partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    L1,
    L2,
}

/// Outcome of a Cache Manager `get` (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Full(CachedResult, HitTier),
    Partial { data: BTreeMap<String, FieldValue>, fields_found: usize, fields_requested: usize },
    Miss,
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub l1_hits: AtomicU64,
    pub l2_hits: AtomicU64,
    pub l3_hits: AtomicU64,
    pub misses: AtomicU64,
    pub total_requests: AtomicU64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l3_hits: self.l3_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CacheStatsSnapshot {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub l3_hits: u64,
    pub misses: u64,
    pub total_requests: u64,
}

pub struct CacheManager {
    tier1: Tier1Cache,
    tier2: Tier2Cache,
    tier3: Tier3Cache,
    stats: CacheStats,
}

impl CacheManager {
    pub fn open(cache_dir: &Path, l1_capacity: usize) -> Result<Self, CacheError> {
        let db = sled::open(cache_dir)?;
        Ok(CacheManager {
            tier1: Tier1Cache::new(if l1_capacity == 0 { L1_MAX } else { l1_capacity }),
            tier2: Tier2Cache::open(&db)?,
            tier3: Tier3Cache::open(&db)?,
            stats: CacheStats::default(),
        })
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn tier1_len(&self) -> usize {
        self.tier1.len()
    }

    pub fn tier2_size_on_disk(&self) -> Result<u64, CacheError> {
        self.tier2.size_on_disk()
    }

    /// Test-only hook used by the cache-hit-chain scenario (§8 scenario 1):
    /// purges Tier-1 without touching Tier-2/3, to force the next lookup
    /// down a tier.
    pub fn clear_tier1(&self) {
        self.tier1.clear();
    }

    /// `get` algorithm (§4.5).
    pub fn get(&self, pdf_bytes: &[u8], label: &str, schema: &Schema) -> Result<Outcome, CacheError> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        let key = RequestFingerprint::new(pdf_bytes, label, schema);

        if let Some(result) = self.tier1.get(&key) {
            self.stats.l1_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Outcome::Full(result, HitTier::L1));
        }

        if let Some(result) = self.tier2.get(&key)? {
            self.stats.l2_hits.fetch_add(1, Ordering::Relaxed);
            self.tier1.put(key, result.clone());
            return Ok(Outcome::Full(result, HitTier::L2));
        }

        let mut partial = BTreeMap::new();
        let mut found = 0usize;
        for field in schema.fields() {
            let field_key = FieldFingerprint::new(pdf_bytes, label, field);
            match self.tier3.get(&field_key)? {
                Some(value) => {
                    partial.insert(field.to_string(), FieldValue::String(value));
                    found += 1;
                }
                None => {
                    partial.insert(field.to_string(), FieldValue::Null);
                }
            }
        }

        // Spec note (§4.5 step 3): even a Tier-3 hit on *every* field still
        // surfaces as Partial, not Full — a true Full result only ever
        // comes from Tier-1/Tier-2; an all-fields Tier-3 hit can only occur
        // after those were evicted.
        if found > 0 {
            self.stats.l3_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Outcome::Partial { data: partial, fields_found: found, fields_requested: schema.len() });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        Ok(Outcome::Miss)
    }

    /// `set` algorithm (§4.5): writes the full result to Tier-1/2, and every
    /// non-null field to Tier-3.
    pub fn set(
        &self,
        pdf_bytes: &[u8],
        label: &str,
        schema: &Schema,
        data: BTreeMap<String, FieldValue>,
        metadata: BTreeMap<String, serde_json::Value>,
        timestamp: u64,
    ) -> Result<(), CacheError> {
        let key = RequestFingerprint::new(pdf_bytes, label, schema);
        let result = CachedResult { data: data.clone(), metadata, timestamp };

        self.tier2.put(&key, &result)?;
        self.tier1.put(key, result);

        for (field_name, value) in &data {
            if let FieldValue::String(s) = value {
                let field_key = FieldFingerprint::new(pdf_bytes, label, field_name);
                self.tier3.put(&field_key, s)?;
            }
        }

        Ok(())
    }
}
