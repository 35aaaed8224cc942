//! `OpenAiCompatibleClient`: adapts any HTTP endpoint implementing
//! `/v1/chat/completions` (OpenAI itself, or a compatible local server) to
//! the [`LlmClient`] contract.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use pdfextract_core::error::ProviderError;
use pdfextract_core::{LlmClient, PdfTokenizer, Schema};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::prompt::build_extraction_prompt;

/// Adapter for any `/v1/chat/completions`-compatible endpoint.
///
/// Tokenises the PDF itself (via an injected [`PdfTokenizer`]) to build the
/// row-grouped document text the prompt embeds — the LLM client contract
/// (§6) takes a PDF path, not pre-extracted tokens, so this mirrors what a
/// from-scratch reading of that file would produce, reusing the same
/// row-grouping utility the Structural Matcher uses.
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: Option<String>,
    tokenizer: Arc<dyn PdfTokenizer>,
}

impl OpenAiCompatibleClient {
    pub fn new(
        api_base_url: String,
        model: String,
        timeout_seconds: u64,
        api_key: Option<String>,
        tokenizer: Arc<dyn PdfTokenizer>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(OpenAiCompatibleClient { client, api_base_url, model, api_key, tokenizer })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn run_extraction(&self, pdf_path: &Path, label: &str, schema: &Schema) -> Result<String, ProviderError> {
        let tokenizer = Arc::clone(&self.tokenizer);
        let path = pdf_path.to_path_buf();
        let tokens = tokio::task::spawn_blocking(move || tokenizer.tokenize(&path))
            .await
            .map_err(|e| ProviderError::Request(format!("tokeniser task panicked: {e}")))?
            .map_err(|e| ProviderError::Request(format!("failed to tokenise PDF: {e}")))?;

        let document_text = pdfextract_core::rowgroup::render_document_text(&tokens);
        let prompt = build_extraction_prompt(label, schema, &document_text);

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![Message { role: "user".to_string(), content: prompt }],
            response_format: ResponseFormat { format_type: "json_object".to_string() },
        };

        debug!(target: "pdfextract_llm", "sending extraction request for label {label}, model {}", self.model);

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(target: "pdfextract_llm", "LLM HTTP request failed: {e}");
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Request(e.to_string())
            }
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(target: "pdfextract_llm", "failed to deserialise LLM response: {e}");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => format!("HTTP {status}: {}", env.error.message),
        Err(_) => format!("HTTP {status}: {body}"),
    };
    error!(target: "pdfextract_llm", "LLM request returned HTTP error: {message}");
    Err(ProviderError::Request(message))
}
