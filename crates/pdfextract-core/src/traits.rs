//! Contracts for the two external collaborators the Pipeline depends on
//! (§6). Concrete implementations live in `pdfextract-llm` and
//! `pdfextract-tokenizer`; test fakes live in `pdfextract-testutils`.
//!
//! Defined here (rather than in the implementing crates) so the Pipeline
//! can depend on the trait without creating a dependency cycle back from
//! those crates, which need `pdfextract-core`'s model and row-grouping
//! utility to do their own work.

use async_trait::async_trait;

use crate::error::{ProviderError, TokenizeError};
use crate::model::{PositionedToken, Schema};

/// Given a serialised document and a schema, returns a JSON object whose
/// top-level keys are exactly the requested field names (§6 "LLM client
/// contract"). Validity of the returned text as JSON is the Pipeline's
/// concern, not this trait's — only transport/HTTP failures are errors
/// here.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn run_extraction(
        &self,
        pdf_path: &std::path::Path,
        label: &str,
        schema: &Schema,
    ) -> Result<String, ProviderError>;
}

/// Yields the positioned text spans of a PDF (§6 "PDF tokeniser
/// contract"). Empty/whitespace-only spans must already be dropped by the
/// implementation.
pub trait PdfTokenizer: Send + Sync {
    fn tokenize(&self, pdf_path: &std::path::Path) -> Result<Vec<PositionedToken>, TokenizeError>;
}
