//! Extraction rule representation shared by the Pattern Builder (C8) and
//! the Rule Executor (C9).
//!
//! Modelled as a closed tagged union rather than a `(rule_type: String,
//! rule_data: Json)` pair (§9 design note): the compiler enforces that
//! every variant the executor handles is one the builder can actually
//! produce.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule_type", content = "rule_data")]
pub enum ExtractionRule {
    #[serde(rename = "none")]
    None { reason: String },

    #[serde(rename = "regex")]
    Regex { pattern_name: String, regex: String },

    #[serde(rename = "relative_context")]
    RelativeContext { anchor_text: String, direction: Direction },

    #[serde(rename = "position")]
    Position { rel_x: f64, rel_y: f64, tolerance: f64 },

    #[serde(rename = "hybrid")]
    Hybrid { rules: Vec<ExtractionRule> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Below,
}

impl ExtractionRule {
    pub fn rule_type_name(&self) -> &'static str {
        match self {
            ExtractionRule::None { .. } => "none",
            ExtractionRule::Regex { .. } => "regex",
            ExtractionRule::RelativeContext { .. } => "relative_context",
            ExtractionRule::Position { .. } => "position",
            ExtractionRule::Hybrid { .. } => "hybrid",
        }
    }
}

/// The strong-regex catalogue entries (§4.10 step 4) that are trusted to
/// boost every matching token's score, not just the one sub-rule's target.
pub const STRONG_REGEX_PATTERNS: &[&str] = &["cpf", "cnpj", "email", "telefone", "cep"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let rule = ExtractionRule::Hybrid {
            rules: vec![
                ExtractionRule::Regex { pattern_name: "cpf".to_string(), regex: r"\d{3}".to_string() },
                ExtractionRule::RelativeContext { anchor_text: "CPF:".to_string(), direction: Direction::Right },
            ],
        };
        let json = serde_json::to_string(&rule).unwrap();
        let back: ExtractionRule = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, back);
    }

    #[test]
    fn rule_type_name_matches_variant() {
        assert_eq!(ExtractionRule::None { reason: "x".to_string() }.rule_type_name(), "none");
        assert_eq!(ExtractionRule::Position { rel_x: 0.1, rel_y: 0.2, tolerance: 0.05 }.rule_type_name(), "position");
    }
}
