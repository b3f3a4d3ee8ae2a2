//! Command-line entry point for the mining pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use github_graph_miner::config::{Config, read_repository_list};
use github_graph_miner::github::TokenPool;
use github_graph_miner::services::WorkerPool;

#[derive(Parser)]
#[command(
    name = "github-graph-miner",
    about = "Mine GitHub repositories into a Neo4j property graph"
)]
struct Cli {
    /// Path to the JSON configuration document
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,

    /// Path to the newline-delimited repository URL list
    #[arg(long, default_value = "./repository_list.txt")]
    repository_list: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let repositories = read_repository_list(&cli.repository_list)?;
    info!(
        "Mining {} repositories with {} workers",
        repositories.len(),
        config.threads
    );

    let token_pool = Arc::new(TokenPool::new(config.github_tokens.clone())?);
    WorkerPool::new(config, token_pool, repositories).start().await;
    Ok(())
}
