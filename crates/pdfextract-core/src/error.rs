//! Error taxonomy (§7). Each component raises its own typed error; the
//! Pipeline folds them into [`ExtractError`], which is what the HTTP
//! collaborator maps to status codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("durable cache I/O failed: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to (de)serialise cache entry: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("failed to read durable cache size on disk: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TemplateStoreError {
    #[error("template database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to (de)serialise rule payload: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors from the external LLM collaborator (§6 "LLM client contract").
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM request timed out")]
    Timeout,
}

/// Errors from the external PDF tokeniser collaborator (§6 "PDF tokeniser
/// contract").
#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("failed to read PDF: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to tokenise PDF: {0}")]
    Parse(String),
}

/// Top-level error taxonomy (§7). `TemplateUnusable` and
/// `UnparseableLLMResponse` deliberately have no variant here: per §7 they
/// are recovered inside the Pipeline and never propagate as errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Schema is not valid JSON, or a required input is missing.
    /// Maps to 400/422 at the HTTP boundary; never retried.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The LLM or tokeniser failed or timed out. Cache state is not
    /// mutated. Maps to 500 at the HTTP boundary.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// Internal error not attributable to the caller or an upstream
    /// collaborator (e.g. a poisoned lock, a corrupt on-disk store).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ExtractError {
    fn from(err: CacheError) -> Self {
        ExtractError::Internal(err.to_string())
    }
}

impl From<TemplateStoreError> for ExtractError {
    fn from(err: TemplateStoreError) -> Self {
        ExtractError::Internal(err.to_string())
    }
}

impl From<ProviderError> for ExtractError {
    fn from(err: ProviderError) -> Self {
        ExtractError::UpstreamFailure(err.to_string())
    }
}

impl From<TokenizeError> for ExtractError {
    fn from(err: TokenizeError) -> Self {
        ExtractError::UpstreamFailure(err.to_string())
    }
}
