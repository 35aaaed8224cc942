//! A canned-response [`LlmClient`] for offline runs and integration tests
//! that don't want a live provider. Not used in production configs.

use std::path::Path;

use async_trait::async_trait;
use pdfextract_core::error::ProviderError;
use pdfextract_core::{LlmClient, Schema};

pub struct DummyLlmClient {
    response: String,
}

impl DummyLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        DummyLlmClient { response: response.into() }
    }

    /// Responds with every schema field set to `null`.
    pub fn always_empty() -> Self {
        DummyLlmClient { response: "{}".to_string() }
    }
}

#[async_trait]
impl LlmClient for DummyLlmClient {
    async fn run_extraction(&self, _pdf_path: &Path, _label: &str, _schema: &Schema) -> Result<String, ProviderError> {
        Ok(self.response.clone())
    }
}
