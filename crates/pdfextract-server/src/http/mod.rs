//! Axum HTTP front-end (§6 "HTTP surface").

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use pdfextract_core::{CacheManager, Pipeline, TemplateStore};

/// Shared state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone — every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub cache: Arc<CacheManager>,
    pub templates: Arc<TemplateStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/extract", post(handlers::extract))
        .with_state(state)
}
