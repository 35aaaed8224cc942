use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use pdfextract_core::{CacheManager, Pipeline};
use pdfextract_core::templates::TemplateStore;
use pdfextract_llm::OpenAiCompatibleClient;
use pdfextract_tokenizer::PdfiumTokenizer;
use tokio::net::TcpListener;

use crate::config::load_config;
use crate::http::{build_router, AppState};

#[derive(Args, Debug)]
pub struct Command {
    /// Path to the server configuration (YAML).
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Overrides the bind address from the configuration file.
    #[arg(long)]
    bind: Option<String>,
}

pub async fn run(cmd: &Command) -> Result<()> {
    let config = load_config(&cmd.config)
        .with_context(|| format!("loading configuration from {:?}", cmd.config))?;
    let bind_address = cmd.bind.clone().unwrap_or(config.bind_address.clone());

    std::fs::create_dir_all(&config.cache_dir)
        .with_context(|| format!("creating cache directory {:?}", config.cache_dir))?;

    let cache = Arc::new(
        CacheManager::open(&config.cache_dir, config.l1_capacity)
            .with_context(|| "opening durable cache")?,
    );
    let templates = Arc::new(
        TemplateStore::open(&config.template_db_path)
            .with_context(|| "opening template database")?,
    );
    let tokenizer: Arc<PdfiumTokenizer> =
        Arc::new(PdfiumTokenizer::new().with_context(|| "initialising PDF tokeniser")?);
    let llm = Arc::new(OpenAiCompatibleClient::new(
        config.llm.api_base_url.clone(),
        config.llm.model.clone(),
        config.llm.timeout_seconds,
        config.llm.api_key.clone(),
        tokenizer.clone(),
    )?);

    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&cache),
        Arc::clone(&templates),
        llm,
        tokenizer,
    ));

    let state = AppState { pipeline, cache, templates };
    let router = build_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding to {bind_address}"))?;

    info!("pdfextract-server listening on {bind_address}");

    axum::serve(listener, router)
        .await
        .with_context(|| "axum server error")?;

    Ok(())
}
