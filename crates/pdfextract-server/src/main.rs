use anyhow::Result;
use simplelog::{ColorChoice, Config as LogConfig, LevelFilter, TermLogger, TerminalMode};

mod cli;
mod config;
mod http;

#[tokio::main]
async fn main() -> Result<()> {
    TermLogger::init(LevelFilter::Info, LogConfig::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .expect("logger already initialised");

    cli::run().await
}
