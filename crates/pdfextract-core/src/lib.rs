//! Cache tiers, template learning engine, and pipeline orchestration for
//! PDF field extraction.
//!
//! This crate is the core described by components C1-C11: it owns no
//! HTTP surface, no LLM transport, and no PDF parsing — those are
//! supplied by callers through the [`traits::LlmClient`] and
//! [`traits::PdfTokenizer`] contracts.

pub mod cache;
pub mod error;
pub mod keys;
pub mod model;
pub mod pipeline;
pub mod rowgroup;
pub mod templates;
pub mod traits;

pub use cache::{CacheManager, Outcome};
pub use error::ExtractError;
pub use model::{CachedResult, FieldValue, PositionedToken, Schema};
pub use pipeline::{Pipeline, PipelineOutput};
pub use traits::{LlmClient, PdfTokenizer};
