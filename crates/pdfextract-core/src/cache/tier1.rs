//! Tier-1: bounded in-memory LRU cache (C2).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use crate::keys::RequestFingerprint;
use crate::model::CachedResult;

/// Default Tier-1 capacity (I6, `L1_MAX`).
pub const L1_MAX: usize = 100;

/// Bounded LRU over [`RequestFingerprint`] -> [`CachedResult`].
///
/// Single instance shared across requests within one process; `get`
/// promotes to most-recently-used, `put` evicts least-recently-used once
/// over capacity (I6).
pub struct Tier1Cache {
    inner: Mutex<lru::LruCache<RequestFingerprint, CachedResult>>,
}

impl Tier1Cache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(L1_MAX).unwrap());
        Tier1Cache { inner: Mutex::new(lru::LruCache::new(capacity)) }
    }

    pub fn get(&self, key: &RequestFingerprint) -> Option<CachedResult> {
        self.inner.lock().expect("tier1 lock poisoned").get(key).cloned()
    }

    pub fn put(&self, key: RequestFingerprint, value: CachedResult) {
        self.inner.lock().expect("tier1 lock poisoned").put(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("tier1 lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test/ops helper: drop all entries without affecting Tier-2/3.
    pub fn clear(&self) {
        self.inner.lock().expect("tier1 lock poisoned").clear();
    }
}

impl Default for Tier1Cache {
    fn default() -> Self {
        Self::new(L1_MAX)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::Schema;

    fn fp(pdf: &[u8], label: &str) -> RequestFingerprint {
        RequestFingerprint::new(pdf, label, &Schema::new())
    }

    fn result() -> CachedResult {
        CachedResult { data: BTreeMap::new(), metadata: BTreeMap::new(), timestamp: 0 }
    }

    #[test]
    fn size_never_exceeds_l1_max() {
        let cache = Tier1Cache::new(2);
        cache.put(fp(b"a", "l"), result());
        cache.put(fp(b"b", "l"), result());
        cache.put(fp(b"c", "l"), result());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn eviction_is_least_recently_used() {
        let cache = Tier1Cache::new(2);
        cache.put(fp(b"a", "l"), result());
        cache.put(fp(b"b", "l"), result());
        // touch "a" so "b" becomes LRU.
        cache.get(&fp(b"a", "l"));
        cache.put(fp(b"c", "l"), result());
        assert!(cache.get(&fp(b"b", "l")).is_none());
        assert!(cache.get(&fp(b"a", "l")).is_some());
        assert!(cache.get(&fp(b"c", "l")).is_some());
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = Tier1Cache::new(10);
        let mut r = result();
        r.data.insert("nome".to_string(), crate::model::FieldValue::String("JOANA".to_string()));
        cache.put(fp(b"a", "l"), r.clone());
        assert_eq!(cache.get(&fp(b"a", "l")).unwrap().data, r.data);
    }
}
