//! Rule Executor (C9): applies stored rules to a new document's tokens to
//! reconstruct field values (§4.10).

use regex::Regex;

use crate::model::PositionedToken;
use crate::templates::matcher::StructuralMatcher;
use crate::templates::rules::{Direction, ExtractionRule, STRONG_REGEX_PATTERNS};

const POSITION_SCORE: f64 = 0.9;
const CONTEXT_SCORE: f64 = 0.9;
const STRONG_REGEX_SCORE: f64 = 1.0;

struct Candidate<'a> {
    token: &'a PositionedToken,
    score: f64,
    distance: f64,
}

pub struct RuleExecutor;

impl RuleExecutor {
    /// Executes one rule against a document's tokens. `none` rules yield
    /// `None`. Non-hybrid single-typed rules are never executed directly —
    /// they only ever appear when a hybrid couldn't be formed, and are
    /// treated as unreadable (§4.10).
    pub fn execute(rule: &ExtractionRule, tokens: &[PositionedToken]) -> Option<String> {
        match rule {
            ExtractionRule::None { .. } => None,
            ExtractionRule::Hybrid { rules } => Self::execute_hybrid(rules, tokens),
            ExtractionRule::Regex { .. } | ExtractionRule::RelativeContext { .. } | ExtractionRule::Position { .. } => None,
        }
    }

    fn execute_hybrid(sub_rules: &[ExtractionRule], tokens: &[PositionedToken]) -> Option<String> {
        let r_pos = sub_rules.iter().find_map(|r| match r {
            ExtractionRule::Position { rel_x, rel_y, tolerance } => Some((*rel_x, *rel_y, *tolerance)),
            _ => None,
        });
        let r_ctx = sub_rules.iter().find_map(|r| match r {
            ExtractionRule::RelativeContext { anchor_text, direction } => Some((anchor_text.as_str(), *direction)),
            _ => None,
        });
        let r_rgx = sub_rules.iter().find_map(|r| match r {
            ExtractionRule::Regex { pattern_name, regex } => Some((pattern_name.as_str(), regex.as_str())),
            _ => None,
        });

        let (pattern_name, regex_pattern) = r_rgx?;
        let regex = Regex::new(regex_pattern).ok()?;

        let mut candidates: Vec<Candidate> =
            tokens.iter().map(|token| Candidate { token, score: 0.0, distance: f64::INFINITY }).collect();

        if let Some((target_x, target_y, tolerance)) = r_pos {
            for candidate in &mut candidates {
                let dx = candidate.token.rel_x() - target_x;
                let dy = candidate.token.rel_y() - target_y;
                let d = (dx * dx + dy * dy).sqrt();
                candidate.distance = d;
                if d <= tolerance {
                    candidate.score += POSITION_SCORE;
                }
            }
        }

        if let Some((anchor_text, direction)) = r_ctx {
            if let Some(target_idx) = find_context_target(tokens, anchor_text, direction) {
                candidates[target_idx].score += CONTEXT_SCORE;
            }
        }

        if STRONG_REGEX_PATTERNS.contains(&pattern_name) {
            for candidate in &mut candidates {
                if regex.is_match(&candidate.token.text) {
                    candidate.score += STRONG_REGEX_SCORE;
                }
            }
        }

        let mut survivors: Vec<&Candidate> =
            candidates.iter().filter(|c| c.score > 0.0 && regex.is_match(&c.token.text)).collect();

        survivors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
        });

        survivors.first().map(|c| c.token.text.clone())
    }
}

fn find_context_target(tokens: &[PositionedToken], anchor_text: &str, direction: Direction) -> Option<usize> {
    let normalised_anchor = StructuralMatcher::normalise(anchor_text);
    let anchor_idx = tokens
        .iter()
        .position(|t| t.text == anchor_text)
        .or_else(|| tokens.iter().position(|t| StructuralMatcher::normalise(&t.text) == normalised_anchor))
        .or_else(|| tokens.iter().position(|t| t.text.to_lowercase().contains(&anchor_text.to_lowercase())))?;

    let anchor = &tokens[anchor_idx];

    match direction {
        Direction::Right => tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != anchor_idx && (t.y - anchor.y).abs() <= crate::rowgroup::Y_TOL && t.x > anchor.x)
            .min_by(|(_, a), (_, b)| (a.x - anchor.x).partial_cmp(&(b.x - anchor.x)).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i),
        Direction::Below => tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != anchor_idx && (t.x - anchor.x).abs() <= crate::templates::pattern_builder::X_TOL && t.y > anchor.y)
            .min_by(|(_, a), (_, b)| (a.y - anchor.y).partial_cmp(&(b.y - anchor.y)).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken { text: text.to_string(), page: 0, x, y, page_width: 612.0, page_height: 792.0 }
    }

    #[test]
    fn none_rule_executes_to_none() {
        let rule = ExtractionRule::None { reason: "value_is_null".to_string() };
        assert_eq!(RuleExecutor::execute(&rule, &[]), None);
    }

    #[test]
    fn hybrid_rule_without_regex_sub_rule_returns_none() {
        let rule = ExtractionRule::Hybrid {
            rules: vec![ExtractionRule::Position { rel_x: 0.1, rel_y: 0.1, tolerance: 0.05 }],
        };
        assert_eq!(RuleExecutor::execute(&rule, &[]), None);
    }

    #[test]
    fn hybrid_rule_prefers_strong_regex_and_context_over_unrelated_text() {
        let tokens = vec![
            tok("Nome:", 100.0, 200.0),
            tok("JOANA SILVA", 200.0, 200.0),
            tok("CPF:", 100.0, 250.0),
            tok("123.456.789-00", 200.0, 250.0),
            tok("joana@x.com", 200.0, 300.0),
        ];
        let rule = ExtractionRule::Hybrid {
            rules: vec![
                ExtractionRule::Regex { pattern_name: "cpf".to_string(), regex: r"\d{3}\.\d{3}\.\d{3}-\d{2}".to_string() },
                ExtractionRule::RelativeContext { anchor_text: "CPF:".to_string(), direction: Direction::Right },
                ExtractionRule::Position { rel_x: 200.0 / 612.0, rel_y: 250.0 / 792.0, tolerance: 0.05 },
            ],
        };
        let result = RuleExecutor::execute(&rule, &tokens);
        assert_eq!(result.as_deref(), Some("123.456.789-00"));
    }

    #[test]
    fn regex_filter_rejects_non_matching_candidates_even_with_context_score() {
        let tokens = vec![tok("CPF:", 100.0, 200.0), tok("N/A", 200.0, 200.0)];
        let rule = ExtractionRule::Hybrid {
            rules: vec![
                ExtractionRule::Regex { pattern_name: "cpf".to_string(), regex: r"\d{3}\.\d{3}\.\d{3}-\d{2}".to_string() },
                ExtractionRule::RelativeContext { anchor_text: "CPF:".to_string(), direction: Direction::Right },
            ],
        };
        assert_eq!(RuleExecutor::execute(&rule, &tokens), None);
    }
}
