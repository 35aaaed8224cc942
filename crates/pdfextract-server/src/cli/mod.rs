mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(about = "PDF field extraction service")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Serve(serve::Command),
}

pub async fn run() -> Result<()> {
    let args = Args::parse();

    use Command::*;
    match &args.command {
        Serve(cmd) => serve::run(cmd).await,
    }
}
