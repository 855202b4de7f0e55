//! Core domain models for Shardroute.

mod bucket;
mod config;
mod shard;

pub use bucket::{flatten, Bucket, BucketRange, FIRST_BUCKET, SCHEMA_PLACEHOLDER, SCHEMA_PREFIX};
pub use config::{ClusterConfig, PoolSettings};
pub use shard::{BucketToShard, Dsn};
