use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "shardroute",
    about = "Inspect and operate a bucketed PostgreSQL shard cluster",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, env = "SHARDROUTE_CONFIG", help = "Path to the cluster JSON config")]
    pub config: PathBuf,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show the bucket, schema and shard each key routes to")]
    Locate {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,

        #[arg(required = true, help = "Keys to locate")]
        keys: Vec<String>,
    },

    #[command(about = "List distinct shards with the buckets they own")]
    Shards {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Connect to every shard and check it answers")]
    Ping,

    #[command(about = "Run a statement on every bucket, or once per shard")]
    Exec {
        #[arg(long, help = "Run once per shard instead of once per bucket schema")]
        per_shard: bool,

        #[arg(help = "SQL statement; `_bucket_` is replaced with each bucket's schema")]
        sql: String,
    },
}
