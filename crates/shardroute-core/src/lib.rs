//! # Shardroute Core
//!
//! Routes keyed operations across a static set of PostgreSQL shards, each
//! split into bucket schemas that share the shard's connection pool.
//!
//! ```text
//! key ──KeyToBucket──▶ Bucket ──ShardCluster──▶ Shard ──▶ BucketPool
//!                                                         (rewrites _bucket_
//!                                                          to bucket_<n>)
//! ```
//!
//! - [`hashing`] - key → bucket mapping (XXH3, 1-based buckets)
//! - [`pool`] - the pooled client seam and its `sqlx` implementation
//! - [`BucketPool`] - schema-scoped executor
//! - [`ShardCluster`] - topology, lookups, fan-out, lifecycle
//!
//! No tracing subscriber is installed here; embedding processes choose one.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used))]

pub mod bucket_pool;
pub mod cluster;
pub mod error;
pub mod hashing;
pub mod pool;
pub mod shard;

#[cfg(test)]
pub(crate) mod test_support;

pub use bucket_pool::BucketPool;
pub use cluster::ShardCluster;
pub use error::{BoxError, ClusterError, ClusterResult};
pub use hashing::{HashingKeyToBucket, KeyToBucket};
pub use pool::ShardPool;
pub use shard::Shard;

pub use shardroute_types::{
    Bucket, BucketRange, BucketToShard, ClusterConfig, Dsn, PoolSettings, SCHEMA_PLACEHOLDER,
};
pub use tokio_util::sync::CancellationToken;
