//! Unified error types for Shardroute Core.

use shardroute_types::{Bucket, ConfigError};
use thiserror::Error;

/// Type-erased error from a pool driver or a fan-out callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for cluster construction, routing and fan-out.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClusterError {
    /// Configuration was rejected before any pool was opened.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pool creation for a shard DSN failed.
    #[error("can't create pool for shard {dsn}: {source}")]
    PoolCreation {
        /// Redacted DSN of the shard
        dsn: String,
        #[source]
        source: BoxError,
    },

    /// A shard failed its startup liveness probe.
    #[error("can't ping shard {dsn}: {source}")]
    Unreachable {
        /// Redacted DSN of the shard
        dsn: String,
        #[source]
        source: BoxError,
    },

    /// No shard owns the bucket.
    #[error("no such shard for bucket {bucket}")]
    NoSuchShard {
        /// Bucket that has no registered shard
        bucket: Bucket,
    },

    /// The caller's cancellation token fired before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// A fan-out callback failed; carries the first failure by completion order.
    #[error("can't execute callback for {scope}: {source}")]
    FanOut {
        /// `"each shard"` or `"each bucket"`
        scope: &'static str,
        #[source]
        source: BoxError,
    },
}

/// Result type alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;

impl ClusterError {
    /// Check if this is a topology miss.
    pub fn is_no_such_shard(&self) -> bool {
        matches!(self, Self::NoSuchShard { .. })
    }

    /// Check if this error was raised while building the cluster.
    pub fn is_construction_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::PoolCreation { .. } | Self::Unreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_no_such_shard_display() {
        let err = ClusterError::NoSuchShard { bucket: Bucket::new(12) };
        assert!(err.is_no_such_shard());
        assert!(!err.is_construction_error());
        assert_eq!(err.to_string(), "no such shard for bucket 12");
    }

    #[test]
    fn test_fan_out_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "relation does not exist");
        let err = ClusterError::FanOut { scope: "each bucket", source: Box::new(io) };

        let msg = err.to_string();
        assert!(msg.starts_with("can't execute callback for each bucket"));
        assert!(msg.contains("relation does not exist"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_conversion() {
        let err = ClusterError::from(ConfigError::ParseError { message: "eof".to_string() });
        assert!(err.is_construction_error());
        assert!(err.to_string().contains("eof"));
    }
}
