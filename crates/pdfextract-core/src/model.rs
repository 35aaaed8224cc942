//! Shared data model: positioned tokens, schemas, and cached results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single text fragment recovered from a PDF by the tokeniser.
///
/// Coordinates are in PDF points, origin top-left, `y` is the top of the
/// glyph bounding box. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    pub text: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub page_width: f64,
    pub page_height: f64,
}

impl PositionedToken {
    /// US Letter fallback used when the tokeniser does not report page
    /// dimensions (§4.10).
    pub const FALLBACK_PAGE_WIDTH: f64 = 612.0;
    pub const FALLBACK_PAGE_HEIGHT: f64 = 792.0;

    pub fn rel_x(&self) -> f64 {
        let w = if self.page_width > 0.0 { self.page_width } else { Self::FALLBACK_PAGE_WIDTH };
        self.x / w
    }

    pub fn rel_y(&self) -> f64 {
        let h = if self.page_height > 0.0 { self.page_height } else { Self::FALLBACK_PAGE_HEIGHT };
        self.y / h
    }
}

/// An extraction schema: ordered field name -> natural-language description.
///
/// Order is preserved for responses but insignificant for cache keys, which
/// canonicalise by sorted-key hashing (see [`crate::keys`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema(Vec<(String, String)>);

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, description: impl Into<String>) {
        self.0.push((field.into(), description.into()));
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn description(&self, field: &str) -> Option<&str> {
        self.0.iter().find(|(name, _)| name == field).map(|(_, desc)| desc.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, desc)| (name.as_str(), desc.as_str()))
    }

    /// Canonical JSON encoding: keys sorted lexicographically, no
    /// insignificant whitespace. Used as the pre-image of the schema hash.
    pub fn canonical_json(&self) -> String {
        let sorted: BTreeMap<&str, &str> =
            self.0.iter().map(|(name, desc)| (name.as_str(), desc.as_str())).collect();
        serde_json::to_string(&sorted).expect("map of strings always serialises")
    }

    /// Builds a reduced schema retaining only the named fields, preserving
    /// the original field order.
    pub fn restrict(&self, fields: &[String]) -> Schema {
        Schema(self.0.iter().filter(|(name, _)| fields.contains(name)).cloned().collect())
    }
}

impl FromIterator<(String, String)> for Schema {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Schema(iter.into_iter().collect())
    }
}

/// A single extracted field value: either a string, or a positive statement
/// that the field is known to be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Null,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            FieldValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(s) => FieldValue::String(s),
            None => FieldValue::Null,
        }
    }
}

/// Full payload written to, and read from, Tier-1/Tier-2 of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub data: BTreeMap<String, FieldValue>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub timestamp: u64,
}
