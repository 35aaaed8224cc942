//! Tier-3: per-field partial cache (C4). Shares the storage substrate with
//! Tier-2 (a separate tree in the same `sled` database); never stores a
//! null value (I2) — absence is key non-existence.

use crate::error::CacheError;
use crate::keys::FieldFingerprint;

pub struct Tier3Cache {
    tree: sled::Tree,
}

impl Tier3Cache {
    pub fn open(db: &sled::Db) -> Result<Self, CacheError> {
        Ok(Tier3Cache { tree: db.open_tree("tier3_fields")? })
    }

    pub fn get(&self, key: &FieldFingerprint) -> Result<Option<String>, CacheError> {
        match self.tree.get(key.storage_key().as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    /// Stores a field value. Callers must never pass a null/absent value
    /// (I2); the Cache Manager enforces this by only calling `put` for
    /// non-null fields of a result being written back.
    pub fn put(&self, key: &FieldFingerprint, value: &str) -> Result<(), CacheError> {
        self.tree.insert(key.storage_key().as_bytes(), value.as_bytes())?;
        Ok(())
    }
}
