//! Pipeline (C11): the top-level state machine chaining cache lookup,
//! template-based extraction, and LLM fallback (§4.12).

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{error, info, warn};

use crate::cache::{CacheManager, Outcome};
use crate::error::ExtractError;
use crate::model::{FieldValue, Schema};
use crate::templates::{TemplateOrchestrator, TemplateStore};
use crate::traits::{LlmClient, PdfTokenizer};

/// The merged extraction result plus the steps the pipeline actually took,
/// mirroring §6's `_pipeline: {method, steps[]}` response shape.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PipelineOutput {
    pub data: BTreeMap<String, FieldValue>,
    pub method: &'static str,
    pub steps: Vec<&'static str>,
}

pub struct Pipeline {
    cache: Arc<CacheManager>,
    templates: Arc<TemplateStore>,
    llm: Arc<dyn LlmClient>,
    tokenizer: Arc<dyn PdfTokenizer>,
}

impl Pipeline {
    pub fn new(
        cache: Arc<CacheManager>,
        templates: Arc<TemplateStore>,
        llm: Arc<dyn LlmClient>,
        tokenizer: Arc<dyn PdfTokenizer>,
    ) -> Self {
        Pipeline { cache, templates, llm, tokenizer }
    }

    pub async fn extract(&self, pdf_bytes: Vec<u8>, label: String, schema: Schema) -> Result<PipelineOutput, ExtractError> {
        let mut steps: Vec<&'static str> = Vec::new();

        // CACHE_LOOKUP
        let cache = Arc::clone(&self.cache);
        let lookup_bytes = pdf_bytes.clone();
        let lookup_label = label.clone();
        let lookup_schema = schema.clone();
        let outcome = tokio::task::spawn_blocking(move || cache.get(&lookup_bytes, &lookup_label, &lookup_schema))
            .await
            .map_err(|e| ExtractError::Internal(format!("cache lookup task panicked: {e}")))??;

        let (mut data, mut schema_to_extract) = match outcome {
            Outcome::Full(result, _tier) => {
                // L1/L2_HIT: return unchanged, no learning, no writeback.
                return Ok(PipelineOutput { data: result.data, method: "cache-l2", steps: vec!["cache-l2"] });
            }
            Outcome::Partial { data, .. } => {
                steps.push("cache-l3");
                let remaining: Vec<String> =
                    data.iter().filter(|(_, v)| v.is_null()).map(|(k, _)| k.clone()).collect();
                (data, schema.restrict(&remaining))
            }
            Outcome::Miss => (BTreeMap::new(), schema.clone()),
        };

        // TOKENISE
        let pdf_path = write_temp_pdf(&pdf_bytes)?;
        let tokenizer = Arc::clone(&self.tokenizer);
        let path_for_tokenize = pdf_path.path().to_path_buf();
        let tokens = tokio::task::spawn_blocking(move || tokenizer.tokenize(&path_for_tokenize))
            .await
            .map_err(|e| ExtractError::Internal(format!("tokenise task panicked: {e}")))??;

        // TEMPLATE_ATTEMPT
        let mut llm_was_called = false;
        if !schema_to_extract.is_empty() {
            let templates = Arc::clone(&self.templates);
            let template_label = label.clone();
            let template_tokens = tokens.clone();
            let template_result = tokio::task::spawn_blocking(move || {
                let orchestrator = TemplateOrchestrator::new(&templates);
                orchestrator.check_and_use_template(&template_label, &template_tokens)
            })
            .await
            .map_err(|e| ExtractError::Internal(format!("template task panicked: {e}")))??;

            if let Some(template_fields) = template_result {
                let mut adopted_any = false;
                let mut still_missing = Vec::new();
                for field in schema_to_extract.fields() {
                    match template_fields.get(field) {
                        Some(value) if !value.is_null() => {
                            data.insert(field.to_string(), value.clone());
                            adopted_any = true;
                        }
                        _ => still_missing.push(field.to_string()),
                    }
                }
                schema_to_extract = schema_to_extract.restrict(&still_missing);
                if adopted_any {
                    steps.push("template");
                }
            }
        }

        // LLM_FALLBACK
        let mut llm_result: BTreeMap<String, FieldValue> = BTreeMap::new();
        if !schema_to_extract.is_empty() {
            llm_was_called = true;

            let raw = self.llm.run_extraction(pdf_path.path(), &label, &schema_to_extract).await?;
            llm_result = parse_llm_response(&raw, &schema_to_extract);

            for (field, value) in &llm_result {
                data.insert(field.clone(), value.clone());
            }

            steps.push(if steps.is_empty() { "llm-full" } else { "llm-fallback" });
        }

        // LEARN
        if llm_was_called {
            let templates = Arc::clone(&self.templates);
            let learn_label = label.clone();
            let learn_schema = schema_to_extract.clone();
            let learn_tokens = tokens.clone();
            let learn_result = llm_result.clone();
            let learn_outcome = tokio::task::spawn_blocking(move || {
                let orchestrator = TemplateOrchestrator::new(&templates);
                orchestrator.learn(&learn_label, &learn_schema, &learn_result, &learn_tokens)
            })
            .await;
            match learn_outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("learning failed for label {label}: {err}"),
                Err(err) => error!("learning task panicked for label {label}: {err}"),
            }
        }

        // WRITEBACK
        let cache = Arc::clone(&self.cache);
        let writeback_bytes = pdf_bytes;
        let writeback_label = label;
        let writeback_schema = schema;
        let writeback_data = data.clone();
        let metadata = BTreeMap::new();
        let writeback_outcome = tokio::task::spawn_blocking(move || {
            let timestamp = now_seconds();
            cache.set(&writeback_bytes, &writeback_label, &writeback_schema, writeback_data, metadata, timestamp)
        })
        .await;
        match writeback_outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("cache writeback failed: {err}"),
            Err(err) => error!("writeback task panicked: {err}"),
        }

        let method = steps.last().copied().unwrap_or("llm-full");
        info!("extraction complete: steps={steps:?}");
        Ok(PipelineOutput { data, method, steps })
    }
}

fn write_temp_pdf(pdf_bytes: &[u8]) -> Result<tempfile::NamedTempFile, ExtractError> {
    use std::io::Write;
    let mut file = tempfile::NamedTempFile::new()
        .map_err(|e| ExtractError::Internal(format!("failed to create temp file for PDF: {e}")))?;
    file.write_all(pdf_bytes)
        .map_err(|e| ExtractError::Internal(format!("failed to write temp PDF: {e}")))?;
    Ok(file)
}

fn now_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Parses the LLM's raw JSON text into field values for exactly the
/// requested schema fields. Per §7, an unparseable response is recovered
/// by treating the result as empty — every requested field becomes
/// `null` — rather than failing the request.
fn parse_llm_response(raw: &str, schema: &Schema) -> BTreeMap<String, FieldValue> {
    let sliced = slice_json_object(raw).unwrap_or(raw);
    let parsed: Option<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_str(sliced).ok().and_then(|v: serde_json::Value| v.as_object().cloned());

    let mut out = BTreeMap::new();
    for field in schema.fields() {
        let value = parsed
            .as_ref()
            .and_then(|map| map.get(field))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        out.insert(field.to_string(), FieldValue::from(value));
    }
    out
}

/// Defensively slices from the first `{` to the last `}` (§6 "LLM client
/// contract") since the raw text may contain reasoning preamble.
fn slice_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}
