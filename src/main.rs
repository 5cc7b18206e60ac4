//! Songlake CLI
//!
//! One-shot batch run: load configuration, build the execution session,
//! run both pipeline stages. Exit status 0 on full success, 1 otherwise.

use clap::Parser;
use songlake::{pipeline, LakeConfig, LakeSession};
use std::path::PathBuf;

/// Songlake batch ETL
#[derive(Parser, Debug)]
#[command(name = "songlake")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run configuration file (YAML). Built-in defaults and AWS_*
    /// environment credentials apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> songlake::Result<()> {
    let config = match &cli.config {
        Some(path) => LakeConfig::load(path)?,
        None => LakeConfig::default(),
    };

    let session = LakeSession::new();
    pipeline::run(&session, &config).await
}
