//! Deterministic content-addressed cache keys (C1).
//!
//! Pure functions, no internal state. SHA-256 over the PDF bytes; SHA-256
//! over the schema's canonical JSON encoding (sorted keys).

use std::fmt;
use std::io::Write;

use sha::sha256::Sha256;
use sha::utils::DigestExt;

use crate::model::Schema;

/// Hex-encoded SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest32([u8; 32]);

impl Digest32 {
    fn of(bytes: &[u8]) -> Self {
        let mut hash = Sha256::default();
        hash.write_all(bytes).expect("hashing into memory never fails");
        let digest = hash.to_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Digest32(out)
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// The `(sha256(pdf_bytes), label, sha256(canonical_schema_json))` tuple
/// keying Tier-1/Tier-2 (§3 "RequestFingerprint").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestFingerprint {
    pdf_hash: Digest32,
    label: String,
    schema_hash: Digest32,
}

impl RequestFingerprint {
    pub fn new(pdf_bytes: &[u8], label: &str, schema: &Schema) -> Self {
        RequestFingerprint {
            pdf_hash: Digest32::of(pdf_bytes),
            label: label.to_owned(),
            schema_hash: Digest32::of(schema.canonical_json().as_bytes()),
        }
    }

    /// Storage key for the persistent Tier-2 store: `{pdf_hash}:{label}:{schema_hash}`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.pdf_hash, self.label, self.schema_hash)
    }
}

/// The `(sha256(pdf_bytes), label, field_name)` tuple keying Tier-3 (§3
/// "FieldFingerprint"). Independent of the surrounding schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldFingerprint {
    pdf_hash: Digest32,
    label: String,
    field_name: String,
}

impl FieldFingerprint {
    pub fn new(pdf_bytes: &[u8], label: &str, field_name: &str) -> Self {
        FieldFingerprint {
            pdf_hash: Digest32::of(pdf_bytes),
            label: label.to_owned(),
            field_name: field_name.to_owned(),
        }
    }

    /// Storage key for the persistent Tier-3 store: `field:{pdf_hash}:{label}:{field_name}`.
    pub fn storage_key(&self) -> String {
        format!("field:{}:{}:{}", self.pdf_hash, self.label, self.field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(fields: &[(&str, &str)]) -> Schema {
        fields.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn l1_l2_key_is_deterministic() {
        let s = schema(&[("nome", "full name"), ("cpf", "taxpayer id")]);
        let a = RequestFingerprint::new(b"pdf-bytes", "oab", &s);
        let b = RequestFingerprint::new(b"pdf-bytes", "oab", &s);
        assert_eq!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn l1_l2_key_insensitive_to_schema_field_order() {
        let forward = schema(&[("nome", "full name"), ("cpf", "taxpayer id")]);
        let backward = schema(&[("cpf", "taxpayer id"), ("nome", "full name")]);
        let a = RequestFingerprint::new(b"pdf-bytes", "oab", &forward);
        let b = RequestFingerprint::new(b"pdf-bytes", "oab", &backward);
        assert_eq!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn l1_l2_key_changes_with_label() {
        let s = schema(&[("nome", "full name")]);
        let a = RequestFingerprint::new(b"pdf-bytes", "oab", &s);
        let b = RequestFingerprint::new(b"pdf-bytes", "cnh", &s);
        assert_ne!(a.storage_key(), b.storage_key());
    }

    #[test]
    fn l3_key_independent_of_schema() {
        let a = FieldFingerprint::new(b"pdf-bytes", "oab", "nome");
        let b = FieldFingerprint::new(b"pdf-bytes", "oab", "nome");
        assert_eq!(a.storage_key(), b.storage_key());
        assert!(a.storage_key().starts_with("field:"));
    }
}
