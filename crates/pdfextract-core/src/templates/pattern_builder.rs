//! Pattern Builder (C8): learns a per-field extraction rule from one
//! known value and the positioned tokens of the document it came from
//! (§4.9).

use regex::Regex;

use crate::model::PositionedToken;
use crate::rowgroup::Y_TOL;
use crate::templates::rules::{Direction, ExtractionRule};

/// Column tolerance for an anchor strictly above the value token (§4.9).
pub const X_TOL: f64 = 20.0;

struct RegexCatalogueEntry {
    name: &'static str,
    pattern: &'static str,
    base_confidence: f64,
}

/// Fixed catalogue, in priority order: first entry whose name is a
/// substring of the field name, or whose regex matches anywhere in the
/// value (unanchored search, matching the original's `re.search`), wins.
const REGEX_CATALOGUE: &[RegexCatalogueEntry] = &[
    RegexCatalogueEntry { name: "cpf", pattern: r"\d{3}\.?\d{3}\.?\d{3}-?\d{2}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "cnpj", pattern: r"\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "email", pattern: r"[\w.-]+@[\w.-]+\.\w+", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "telefone", pattern: r"\(?\d{2}\)?\s?\d{4,5}-?\d{4}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "cep", pattern: r"\d{5}-?\d{3}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "valor_monetario", pattern: r"R\$\s?\d{1,3}(?:\.\d{3})*(?:[.,]\d{2})", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "data", pattern: r"\d{2}/\d{2}/\d{4}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "numero_inscricao", pattern: r"\d{5,8}", base_confidence: 1.0 },
    RegexCatalogueEntry { name: "numero", pattern: r"\d+", base_confidence: 0.7 },
    RegexCatalogueEntry { name: "texto", pattern: r"^[^\d]+$", base_confidence: 0.7 },
    RegexCatalogueEntry { name: "outros", pattern: r".+", base_confidence: 0.7 },
];

pub struct PatternBuilder;

impl PatternBuilder {
    /// Builds a rule for `field_name` given the known `field_value` (may be
    /// absent/null) and the tokens of the document it was observed in.
    pub fn build(field_name: &str, field_value: Option<&str>, tokens: &[PositionedToken]) -> (ExtractionRule, f64) {
        let value = match field_value {
            None => return (ExtractionRule::None { reason: "value_is_null".to_string() }, 0.9),
            Some(v) if v == "null" => return (ExtractionRule::None { reason: "value_is_null".to_string() }, 0.9),
            Some(v) => v,
        };

        let Some(value_token) = locate_value_token(value, tokens) else {
            return (ExtractionRule::None { reason: "value_not_found".to_string() }, 0.1);
        };

        let regex_sub = build_regex_rule(field_name, value);
        let context_sub = build_context_rule(value_token, tokens);
        let position_sub = build_position_rule(value_token);

        let mut succeeded: Vec<(ExtractionRule, f64)> = Vec::new();
        if let Some(r) = regex_sub {
            succeeded.push(r);
        }
        if let Some(r) = context_sub {
            succeeded.push(r);
        }
        if let Some(r) = position_sub {
            succeeded.push(r);
        }

        match succeeded.len() {
            0 => (ExtractionRule::None { reason: "no_pattern_found".to_string() }, 0.1),
            1 => succeeded.into_iter().next().unwrap(),
            _ => {
                let mean: f64 = succeeded.iter().map(|(_, c)| c).sum::<f64>() / succeeded.len() as f64;
                let confidence = (mean + 0.2).min(0.99);
                let rules = succeeded.into_iter().map(|(r, _)| r).collect();
                (ExtractionRule::Hybrid { rules }, confidence)
            }
        }
    }
}

fn locate_value_token<'a>(value: &str, tokens: &'a [PositionedToken]) -> Option<&'a PositionedToken> {
    tokens
        .iter()
        .find(|t| t.text == value)
        .or_else(|| tokens.iter().find(|t| t.text.contains(value)))
}

fn build_regex_rule(field_name: &str, value: &str) -> Option<(ExtractionRule, f64)> {
    let field_lower = field_name.to_lowercase();
    for entry in REGEX_CATALOGUE {
        let name_matches = field_lower.contains(entry.name);
        let value_matches = Regex::new(entry.pattern).ok()?.is_match(value);
        if name_matches || value_matches {
            return Some((
                ExtractionRule::Regex { pattern_name: entry.name.to_string(), regex: entry.pattern.to_string() },
                entry.base_confidence,
            ));
        }
    }
    None
}

fn build_context_rule(value_token: &PositionedToken, tokens: &[PositionedToken]) -> Option<(ExtractionRule, f64)> {
    let is_numeric_token = |t: &&PositionedToken| t.text.chars().any(|c| c.is_ascii_digit()) && t.text.chars().all(|c| c.is_ascii_digit() || ".,-/R$ %".contains(c));

    // Same-row anchor, strictly to the left, smallest dx (§4.9).
    let same_row_anchor = tokens
        .iter()
        .filter(|t| !std::ptr::eq(*t, value_token))
        .filter(|t| (t.y - value_token.y).abs() <= Y_TOL)
        .filter(|t| t.x < value_token.x)
        .filter(|t| !is_numeric_token(t))
        .min_by(|a, b| (value_token.x - a.x).partial_cmp(&(value_token.x - b.x)).unwrap_or(std::cmp::Ordering::Equal));

    if let Some(anchor) = same_row_anchor {
        return Some((
            ExtractionRule::RelativeContext { anchor_text: anchor.text.clone(), direction: Direction::Right },
            0.8,
        ));
    }

    // Anchor strictly above, within column tolerance.
    let above_anchor = tokens
        .iter()
        .filter(|t| !std::ptr::eq(*t, value_token))
        .filter(|t| t.y < value_token.y)
        .filter(|t| (t.x - value_token.x).abs() <= X_TOL)
        .filter(|t| !is_numeric_token(t))
        .min_by(|a, b| (value_token.y - a.y).partial_cmp(&(value_token.y - b.y)).unwrap_or(std::cmp::Ordering::Equal));

    above_anchor.map(|anchor| {
        (ExtractionRule::RelativeContext { anchor_text: anchor.text.clone(), direction: Direction::Below }, 0.8)
    })
}

fn build_position_rule(value_token: &PositionedToken) -> Option<(ExtractionRule, f64)> {
    if value_token.page_width <= 0.0 || value_token.page_height <= 0.0 {
        return None;
    }
    Some((
        ExtractionRule::Position { rel_x: value_token.rel_x(), rel_y: value_token.rel_y(), tolerance: 0.05 },
        0.6,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken { text: text.to_string(), page: 0, x, y, page_width: 612.0, page_height: 792.0 }
    }

    #[test]
    fn null_value_yields_none_rule_with_high_confidence() {
        let (rule, confidence) = PatternBuilder::build("nome", None, &[]);
        assert_eq!(rule, ExtractionRule::None { reason: "value_is_null".to_string() });
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn literal_null_string_is_treated_as_null() {
        let (rule, _) = PatternBuilder::build("nome", Some("null"), &[]);
        assert_eq!(rule, ExtractionRule::None { reason: "value_is_null".to_string() });
    }

    #[test]
    fn value_not_found_yields_low_confidence_none() {
        let tokens = vec![tok("Nome:", 0.0, 0.0)];
        let (rule, confidence) = PatternBuilder::build("cpf", Some("123.456.789-00"), &tokens);
        assert_eq!(rule, ExtractionRule::None { reason: "value_not_found".to_string() });
        assert_eq!(confidence, 0.1);
    }

    #[test]
    fn three_agreeing_signals_produce_hybrid_rule() {
        let tokens = vec![tok("CPF:", 100.0, 200.0), tok("123.456.789-00", 200.0, 200.0)];
        let (rule, confidence) = PatternBuilder::build("cpf", Some("123.456.789-00"), &tokens);
        match rule {
            ExtractionRule::Hybrid { rules } => assert_eq!(rules.len(), 3),
            other => panic!("expected hybrid rule, got {other:?}"),
        }
        assert!(confidence > 0.8 && confidence <= 0.99);
    }

    #[test]
    fn context_rule_prefers_same_row_anchor_over_above_anchor() {
        let tokens = vec![
            tok("Outro:", 100.0, 100.0),
            tok("CPF:", 100.0, 200.0),
            tok("123.456.789-00", 200.0, 200.0),
        ];
        let value_token = &tokens[2];
        let (rule, _) = build_context_rule(value_token, &tokens).unwrap();
        assert_eq!(rule, ExtractionRule::RelativeContext { anchor_text: "CPF:".to_string(), direction: Direction::Right });
    }
}
