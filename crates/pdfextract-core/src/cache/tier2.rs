//! Tier-2: unbounded durable cache (C3), backed by a `sled` tree.
//!
//! `sled` is an embedded persistent key/value store used elsewhere in the
//! pack (`harborgrid-justin-caddy`); it gives us "survives process restart"
//! and "safe for concurrent multi-writer access on a single host" (§5) for
//! free, without a bespoke on-disk format.

use crate::error::CacheError;
use crate::keys::RequestFingerprint;
use crate::model::CachedResult;

pub struct Tier2Cache {
    db: sled::Db,
    tree: sled::Tree,
}

impl Tier2Cache {
    pub fn open(db: &sled::Db) -> Result<Self, CacheError> {
        Ok(Tier2Cache { db: db.clone(), tree: db.open_tree("tier2_results")? })
    }

    pub fn get(&self, key: &RequestFingerprint) -> Result<Option<CachedResult>, CacheError> {
        match self.tree.get(key.storage_key().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put(&self, key: &RequestFingerprint, value: &CachedResult) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.tree.insert(key.storage_key().as_bytes(), bytes)?;
        Ok(())
    }

    /// Size in bytes of the durable cache database on disk, for `/stats`
    /// introspection (§4.3). `sled::Db::size_on_disk` reports the whole
    /// database file, which Tier-2 and Tier-3 share one instance of, so
    /// this is the combined Tier-2 + Tier-3 footprint, not Tier-2 alone.
    pub fn size_on_disk(&self) -> Result<u64, CacheError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::Schema;

    #[test]
    fn set_then_get_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let key = RequestFingerprint::new(b"pdf", "oab", &Schema::new());
        let mut result = CachedResult { data: BTreeMap::new(), metadata: BTreeMap::new(), timestamp: 7 };
        result.data.insert("nome".to_string(), crate::model::FieldValue::String("JOANA".to_string()));

        {
            let db = sled::open(dir.path()).unwrap();
            let tier2 = Tier2Cache::open(&db).unwrap();
            tier2.put(&key, &result).unwrap();
            db.flush().unwrap();
        }
        {
            let db = sled::open(dir.path()).unwrap();
            let tier2 = Tier2Cache::open(&db).unwrap();
            let fetched = tier2.get(&key).unwrap().expect("entry should survive reopen");
            assert_eq!(fetched.data, result.data);
        }
    }

    #[test]
    fn miss_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let tier2 = Tier2Cache::open(&db).unwrap();
        let key = RequestFingerprint::new(b"pdf", "oab", &Schema::new());
        assert!(tier2.get(&key).unwrap().is_none());
    }

    #[test]
    fn size_on_disk_reports_bytes_not_entry_count() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let tier2 = Tier2Cache::open(&db).unwrap();
        let before = tier2.size_on_disk().unwrap();

        let key = RequestFingerprint::new(b"pdf", "oab", &Schema::new());
        let mut result = CachedResult { data: BTreeMap::new(), metadata: BTreeMap::new(), timestamp: 1 };
        result.data.insert("nome".to_string(), crate::model::FieldValue::String("a".repeat(4096)));
        tier2.put(&key, &result).unwrap();
        db.flush().unwrap();

        let after = tier2.size_on_disk().unwrap();
        // A single entry's on-disk footprint is many times the entry count
        // (1); only a real byte size, not `Tree::len()`, can grow by this
        // much from one 4KB value.
        assert!(after > before + 1024, "expected byte growth, got before={before} after={after}");
    }
}
