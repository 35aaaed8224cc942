//! Structural Matcher (C7): builds and compares structural signatures of
//! documents.
//!
//! `extract_signature` follows the literal spec recipe — normalise the
//! row-grouped document text and test each known label for substring
//! presence — rather than the richer scored-candidate heuristic the
//! original Portuguese implementation used to additionally admit a single
//! unknown label per document. That extra heuristic is not implemented:
//! see the design notes for why.

use std::collections::BTreeSet;

use unicode_normalization::UnicodeNormalization;

use crate::model::PositionedToken;
use crate::rowgroup::render_document_text;

/// Jaccard similarity threshold for accepting a template match (§4.7).
pub const JACCARD_THRESHOLD: f64 = 0.80;

/// Fixed vocabulary of domain label terms (§4.7). Carried over from the
/// Portuguese source corpus this system was trained against.
pub const KNOWN_LABELS: &[&str] = &[
    "nome",
    "inscricao",
    "seccional",
    "subsecao",
    "categoria",
    "endereco",
    "telefone",
    "situacao",
    "data",
    "sistema",
    "produto",
    "valor",
    "quantidade",
    "tipo",
    "cidade",
    "referencia",
    "cpf",
    "cnpj",
    "cep",
    "email",
    "hora",
    "total",
    "subtotal",
    "descontos",
    "emissao",
    "vencimento",
    "pagamento",
    "banco",
    "agencia",
    "conta",
    "favorecido",
    "documento",
    "numero do documento",
    "endereco de entrega",
    "forma de pagamento",
];

pub struct StructuralMatcher;

impl StructuralMatcher {
    /// Lowercase, strip diacritics (NFD then drop combining marks), trim,
    /// drop a trailing `:` (§4.7).
    pub fn normalise(text: &str) -> String {
        let lower = text.to_lowercase();
        let stripped: String = lower.nfd().filter(|c| !is_combining_mark(*c)).collect();
        let trimmed = stripped.trim();
        trimmed.strip_suffix(':').unwrap_or(trimmed).trim().to_string()
    }

    pub fn extract_signature(tokens: &[PositionedToken]) -> BTreeSet<String> {
        let text = render_document_text(tokens);
        let normalised = Self::normalise(&text);
        KNOWN_LABELS
            .iter()
            .filter(|label| normalised.contains(*label))
            .map(|label| label.to_string())
            .collect()
    }

    /// Jaccard similarity between a freshly extracted signature and a
    /// stored one, plus whether it clears [`JACCARD_THRESHOLD`] (§4.7).
    pub fn similarity(new_signature: &BTreeSet<String>, stored: &[String]) -> (bool, f64) {
        let stored_set: BTreeSet<String> = stored.iter().cloned().collect();
        let union_len = new_signature.union(&stored_set).count();
        if union_len == 0 {
            return (false, 0.0);
        }
        let inter_len = new_signature.intersection(&stored_set).count();
        let score = inter_len as f64 / union_len as f64;
        (score >= JACCARD_THRESHOLD, score)
    }
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken { text: text.to_string(), page: 0, x, y, page_width: 612.0, page_height: 792.0 }
    }

    #[test]
    fn normalise_strips_diacritics_case_and_trailing_colon() {
        assert_eq!(StructuralMatcher::normalise("Endereço:"), "endereco");
        assert_eq!(StructuralMatcher::normalise("  CPF  "), "cpf");
    }

    #[test]
    fn extract_signature_finds_known_labels_as_substrings() {
        let tokens = vec![
            token("Nome:", 0.0, 0.0),
            token("JOANA SILVA", 60.0, 0.0),
            token("CPF:", 0.0, 20.0),
            token("123.456.789-00", 40.0, 20.0),
        ];
        let sig = StructuralMatcher::extract_signature(&tokens);
        assert!(sig.contains("nome"));
        assert!(sig.contains("cpf"));
        assert!(!sig.contains("endereco"));
    }

    #[test]
    fn similarity_is_jaccard_and_respects_threshold() {
        let new_sig: BTreeSet<String> = ["nome", "cpf"].iter().map(|s| s.to_string()).collect();
        let stored = vec!["nome".to_string(), "cpf".to_string()];
        let (is_match, score) = StructuralMatcher::similarity(&new_sig, &stored);
        assert!(is_match);
        assert_eq!(score, 1.0);

        let stored_partial = vec!["nome".to_string(), "cpf".to_string(), "email".to_string(), "total".to_string()];
        let (is_match, score) = StructuralMatcher::similarity(&new_sig, &stored_partial);
        assert!(!is_match);
        assert_eq!(score, 0.5);
    }

    #[test]
    fn empty_union_is_zero_not_nan() {
        let empty = BTreeSet::new();
        let (is_match, score) = StructuralMatcher::similarity(&empty, &[]);
        assert!(!is_match);
        assert_eq!(score, 0.0);
    }
}
