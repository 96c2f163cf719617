//! # officeindexd
//!
//! Process entry point for the OfficeIndex adapter: starts the HTTP server,
//! or acts as a one-shot CLI client that triggers a reindex on an already
//! running instance.

use clap::{Parser, Subcommand};

use officeindex_core::config::Config;
use officeindex_core::refresh::IndexHandle;
use officeindex_core::{background, server};

#[derive(Parser)]
#[command(
    name = "officeindexd",
    about = "OfficeIndex adapter — incremental search index over office documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,

    /// Trigger a reindex on a running adapter instance and print the summary.
    Reindex {
        /// Refresh mode: full or incremental.
        #[arg(long, default_value = "full")]
        mode: String,

        /// Base URL of the running adapter.
        #[arg(long, default_value = "http://127.0.0.1:8092")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve().await,
        Commands::Reindex { mode, url } => run_reindex(&mode, &url).await,
    }
}

async fn run_serve() -> anyhow::Result<()> {
    let config = Config::from_env();
    let index = IndexHandle::new(config.clone());

    let worker = background::BackgroundWorker::spawn(index.clone(), config.background_sync_seconds)
        .map(std::sync::Arc::new);

    server::run_server(&config, index, worker).await
}

/// POSTs the requested mode to a running adapter instance and prints the
/// JSON summary.
async fn run_reindex(mode: &str, base_url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/reindex", base_url.trim_end_matches('/'));

    let response = client
        .post(&endpoint)
        .json(&serde_json::json!({ "mode": mode }))
        .send()
        .await?;

    let status = response.status();
    let body: serde_json::Value = response.json().await?;

    if !status.is_success() {
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        anyhow::bail!("reindex request failed with status {}", status);
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
