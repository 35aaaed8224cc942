//! Template Orchestrator (C10): the learning policy tying the Template
//! Store, Structural Matcher, Pattern Builder, and Rule Executor together
//! (§4.11).

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::error::TemplateStoreError;
use crate::model::{FieldValue, PositionedToken, Schema};
use crate::templates::matcher::StructuralMatcher;
use crate::templates::pattern_builder::PatternBuilder;
use crate::templates::rule_executor::RuleExecutor;
use crate::templates::store::{TemplateStore, TemplateStoreStats, MATURE_THRESHOLD};

/// Minimum rule confidence to persist a learned rule (§4.11).
pub const MIN_SAVE_CONFIDENCE: f64 = 0.5;

pub struct TemplateOrchestrator<'a> {
    store: &'a TemplateStore,
}

impl<'a> TemplateOrchestrator<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        TemplateOrchestrator { store }
    }

    /// Fast path: look up a template by label, require maturity and
    /// structural similarity, then delegate to the Rule Executor.
    /// Returns `None` when no confident template-based extraction is
    /// possible — this is not an error (§4.11).
    pub fn check_and_use_template(
        &self,
        label: &str,
        tokens: &[PositionedToken],
    ) -> Result<Option<BTreeMap<String, FieldValue>>, TemplateStoreError> {
        let Some(template) = self.store.find_by_label(label)? else {
            return Ok(None);
        };

        if template.sample_count < MATURE_THRESHOLD {
            debug!("template {label} has sample_count {} < {MATURE_THRESHOLD}, skipping", template.sample_count);
            return Ok(None);
        }

        let new_signature = StructuralMatcher::extract_signature(tokens);
        let (is_match, score) = StructuralMatcher::similarity(&new_signature, &template.structural_signature);
        if !is_match {
            debug!("template {label} structural similarity {score:.2} below threshold");
            return Ok(None);
        }

        let rules = self.store.rules_of(template.id)?;
        let mut result = BTreeMap::new();
        for (field_name, rule) in rules {
            let value = RuleExecutor::execute(&rule, tokens);
            result.insert(field_name, FieldValue::from(value));
        }
        Ok(Some(result))
    }

    /// Learning path: union the signature, upsert rules with confidence
    /// `>= MIN_SAVE_CONFIDENCE`. Never fails the surrounding request;
    /// callers should log and continue on `Err`.
    pub fn learn(
        &self,
        label: &str,
        schema: &Schema,
        llm_data: &BTreeMap<String, FieldValue>,
        tokens: &[PositionedToken],
    ) -> Result<(), TemplateStoreError> {
        let new_signature = StructuralMatcher::extract_signature(tokens);
        let signature_vec: Vec<String> = new_signature.into_iter().collect();

        let template_id = match self.store.find_by_label(label)? {
            Some(existing) => {
                self.store.extend_signature(existing.id, &signature_vec)?;
                existing.id
            }
            None => self.store.create(label, &signature_vec)?,
        };

        for field_name in schema.fields() {
            let field_value = llm_data.get(field_name).and_then(FieldValue::as_str);
            let (rule, confidence) = PatternBuilder::build(field_name, field_value, tokens);
            if confidence >= MIN_SAVE_CONFIDENCE {
                self.store.upsert_rule(template_id, field_name, &rule, confidence)?;
            } else {
                warn!("not saving rule for field {field_name} on template {label}: confidence {confidence:.2} below {MIN_SAVE_CONFIDENCE}");
            }
        }

        Ok(())
    }

    pub fn stats(&self) -> Result<TemplateStoreStats, TemplateStoreError> {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken { text: text.to_string(), page: 0, x, y, page_width: 612.0, page_height: 792.0 }
    }

    fn schema(fields: &[&str]) -> Schema {
        fields.iter().map(|f| (f.to_string(), String::new())).collect()
    }

    #[test]
    fn check_and_use_template_returns_none_for_unknown_label() {
        let store = TemplateStore::open_in_memory().unwrap();
        let orchestrator = TemplateOrchestrator::new(&store);
        assert!(orchestrator.check_and_use_template("oab", &[]).unwrap().is_none());
    }

    #[test]
    fn check_and_use_template_returns_none_when_immature() {
        let store = TemplateStore::open_in_memory().unwrap();
        store.create("oab", &["nome".to_string()]).unwrap();
        let orchestrator = TemplateOrchestrator::new(&store);
        assert!(orchestrator.check_and_use_template("oab", &[]).unwrap().is_none());
    }

    #[test]
    fn mature_template_rejected_when_signature_mismatches() {
        let store = TemplateStore::open_in_memory().unwrap();
        // Trains a mature `carteira_oab` template against an OAB-shaped
        // signature (sample_count bumped to 2 via extend_signature).
        let oab_signature =
            ["nome".to_string(), "inscricao".to_string(), "seccional".to_string(), "categoria".to_string()];
        let id = store.create("carteira_oab", &oab_signature).unwrap();
        store.extend_signature(id, &[]).unwrap();

        let orchestrator = TemplateOrchestrator::new(&store);

        // A CNH document submitted under the same label: only "categoria"
        // and "nome" overlap with the trained signature, well below the
        // Jaccard threshold, so the template must be rejected even though
        // it is mature.
        let cnh_tokens = vec![
            tok("Nome:", 0.0, 0.0),
            tok("SON GOKU", 60.0, 0.0),
            tok("Categoria:", 0.0, 20.0),
            tok("B", 60.0, 20.0),
            tok("Data:", 0.0, 40.0),
            tok("01/01/2020", 60.0, 40.0),
        ];

        assert!(orchestrator.check_and_use_template("carteira_oab", &cnh_tokens).unwrap().is_none());
    }

    #[test]
    fn learn_then_mature_template_is_usable() {
        let store = TemplateStore::open_in_memory().unwrap();
        let orchestrator = TemplateOrchestrator::new(&store);
        let schema = schema(&["cpf"]);
        let tokens = vec![tok("CPF:", 100.0, 200.0), tok("123.456.789-00", 200.0, 200.0)];

        let mut llm_data = BTreeMap::new();
        llm_data.insert("cpf".to_string(), FieldValue::String("123.456.789-00".to_string()));

        orchestrator.learn("oab", &schema, &llm_data, &tokens).unwrap();
        orchestrator.learn("oab", &schema, &llm_data, &tokens).unwrap();

        let result = orchestrator.check_and_use_template("oab", &tokens).unwrap().unwrap();
        assert_eq!(result.get("cpf"), Some(&FieldValue::String("123.456.789-00".to_string())));
    }
}
