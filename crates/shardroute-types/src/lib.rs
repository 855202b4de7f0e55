//! # Shardroute Types
//!
//! Foundation types for the Shardroute bucket/shard router.
//!
//! - **`models`** - Buckets, bucket ranges, shard DSNs and cluster configuration
//! - **`error`** - Typed configuration errors
//!
//! ## Architecture Role
//!
//! `shardroute-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!        shardroute-types (this crate)
//!                │
//!                ▼
//!         shardroute-core
//!                │
//!                ▼
//!         shardroute-cli
//! ```
//!
//! Nothing here performs I/O except loading a configuration file.

pub mod error;
pub mod models;

pub use error::{ConfigError, Result};

pub use models::{
    flatten, Bucket, BucketRange, BucketToShard, ClusterConfig, Dsn, PoolSettings, FIRST_BUCKET,
    SCHEMA_PLACEHOLDER, SCHEMA_PREFIX,
};
