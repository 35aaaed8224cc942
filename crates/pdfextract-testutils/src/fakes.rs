//! In-memory stand-ins for the two external collaborators, for tests that
//! drive the Pipeline without a live LLM endpoint or a real PDF file.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use pdfextract_core::error::{ProviderError, TokenizeError};
use pdfextract_core::model::{PositionedToken, Schema};
use pdfextract_core::traits::{LlmClient, PdfTokenizer};

/// Returns a fixed JSON response regardless of the request, and records how
/// many times it was called.
pub struct FakeLlmClient {
    response: String,
    calls: Mutex<u32>,
}

impl FakeLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        FakeLlmClient { response: response.into(), calls: Mutex::new(0) }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn run_extraction(&self, _pdf_path: &Path, _label: &str, _schema: &Schema) -> Result<String, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.response.clone())
    }
}

/// Returns a fixed token set regardless of the PDF path.
pub struct FakeTokenizer {
    tokens: Vec<PositionedToken>,
}

impl FakeTokenizer {
    pub fn new(tokens: Vec<PositionedToken>) -> Self {
        FakeTokenizer { tokens }
    }
}

impl PdfTokenizer for FakeTokenizer {
    fn tokenize(&self, _pdf_path: &Path) -> Result<Vec<PositionedToken>, TokenizeError> {
        Ok(self.tokens.clone())
    }
}
