//! Shardroute CLI
//!
//! Loads a cluster config, builds the shard cluster (which probes every
//! shard), runs one command and closes every pool before exiting.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::{Context, Result};
use clap::Parser;
use shardroute_core::{CancellationToken, ShardCluster};
use shardroute_types::ClusterConfig;
use sqlx::PgPool;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log filter {:?}", cli.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = ClusterConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    let cluster = ShardCluster::<PgPool>::from_config(&config, &cancel)
        .await
        .context("failed to build shard cluster")?;

    let result = run(&cluster, &cancel, cli.command).await;
    cluster.close().await;
    result
}

async fn run(cluster: &ShardCluster, cancel: &CancellationToken, command: Commands) -> Result<()> {
    match command {
        Commands::Locate { json, keys } => commands::locate(cluster, &keys, json),
        Commands::Shards { json } => commands::list_shards(cluster, json),
        Commands::Ping => {
            commands::ping(cluster);
            Ok(())
        },
        Commands::Exec { per_shard, sql } => commands::exec(cluster, cancel, &sql, per_shard)
            .await
            .context("statement failed"),
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling in-flight work");
            cancel.cancel();
        },
        Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
    }
}
