//! Cluster configuration.
//!
//! Loaded from a JSON document of the form:
//!
//! ```json
//! {
//!   "bucket_count": 20,
//!   "pool": { "max_connections": 10 },
//!   "shards": [
//!     { "dsn": "${SHARD_1_DSN}", "buckets": [{ "from": 1, "to": 11 }] },
//!     { "dsn": "postgres://app@db-2/orders", "buckets": [{ "from": 11, "to": 21 }] }
//!   ]
//! }
//! ```
//!
//! A DSN written as `${NAME}` is taken from the environment at load time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use super::bucket::{Bucket, FIRST_BUCKET};
use super::shard::{BucketToShard, Dsn};
use crate::error::{ConfigError, Result};

/// Connection pool options applied to every shard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PoolSettings {
    /// Upper bound of open connections per shard
    #[validate(range(min = 1_u32))]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a free connection
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Seconds before an idle connection is closed
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    300
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

/// Full cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ClusterConfig {
    /// Number of buckets keys are hashed into (`1..=bucket_count`)
    #[validate(range(min = 1_u32))]
    pub bucket_count: u32,
    /// Pool options shared by all shards
    #[serde(default)]
    #[validate(nested)]
    pub pool: PoolSettings,
    /// Shards in configuration order; later records win on overlap
    #[validate(length(min = 1_u64), nested)]
    pub shards: Vec<BucketToShard>,
}

impl ClusterConfig {
    /// Parse, resolve `${NAME}` DSNs and validate.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::from_json_error(&e))?;
        config.resolve_env()?;
        config.check()?;
        Ok(config)
    }

    /// Run field validation, reporting the first failing field.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|e| ConfigError::from_validation_errors(&e))
    }

    /// Load a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.display().to_string() });
        }
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::from_io_error(&e))?;
        Self::from_json_str(&content)
    }

    fn resolve_env(&mut self) -> Result<()> {
        for (idx, record) in self.shards.iter_mut().enumerate() {
            let Some(name) = env_reference(record.dsn.expose()) else {
                continue;
            };
            let value = std::env::var(name).map_err(|_| ConfigError::ValidationError {
                field: format!("shards[{}].dsn", idx),
                message: format!("environment variable {} is not set", name),
            })?;
            record.dsn = Dsn::new(value);
        }
        Ok(())
    }

    /// Buckets claimed by more than one record, with the claiming record indices.
    pub fn overlapping_buckets(&self) -> BTreeMap<Bucket, Vec<usize>> {
        let mut owners: BTreeMap<Bucket, Vec<usize>> = BTreeMap::new();
        for (idx, record) in self.shards.iter().enumerate() {
            for bucket in record.flattened() {
                let claims = owners.entry(bucket).or_default();
                if claims.last() != Some(&idx) {
                    claims.push(idx);
                }
            }
        }
        owners.retain(|_, claims| claims.len() > 1);
        owners
    }

    /// Hash-reachable buckets that no record owns, as inclusive runs in
    /// ascending order.
    ///
    /// Works on the configured ranges, so the cost follows the number of
    /// records rather than `bucket_count`.
    pub fn unassigned_buckets(&self) -> Vec<RangeInclusive<Bucket>> {
        let first = u64::from(FIRST_BUCKET.get());
        let end = first + u64::from(self.bucket_count);

        let mut claimed: Vec<(u64, u64)> = self
            .shards
            .iter()
            .flat_map(|record| record.buckets.iter())
            .map(|range| (u64::from(range.from.get()).max(first), u64::from(range.to.get()).min(end)))
            .filter(|(from, to)| from < to)
            .collect();
        claimed.sort_unstable();

        let mut gaps = Vec::new();
        let mut cursor = first;
        for (from, to) in claimed {
            if from > cursor {
                gaps.push(gap(cursor, from));
            }
            cursor = cursor.max(to);
        }
        if cursor < end {
            gaps.push(gap(cursor, end));
        }
        gaps
    }

    /// Number of hash-reachable buckets that no record owns.
    pub fn unassigned_count(&self) -> u64 {
        self.unassigned_buckets()
            .iter()
            .map(|run| u64::from(run.end().get()) - u64::from(run.start().get()) + 1)
            .sum()
    }
}

/// Inclusive bucket run for the half-open `[from, to)`; both bounds lie in
/// `1..=u32::MAX + 1`.
fn gap(from: u64, to: u64) -> RangeInclusive<Bucket> {
    let bucket = |id: u64| Bucket::new(u32::try_from(id).unwrap_or(u32::MAX));
    bucket(from)..=bucket(to - 1)
}

fn env_reference(raw: &str) -> Option<&str> {
    raw.trim().strip_prefix("${")?.strip_suffix('}')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::BucketRange;
    use std::io::Write;

    const THREE_SHARDS: &str = r#"{
        "bucket_count": 6,
        "shards": [
            { "dsn": "postgres://app@db-1/orders", "buckets": [{ "from": 1, "to": 3 }] },
            { "dsn": "postgres://app@db-2/orders", "buckets": [{ "from": 3, "to": 5 }] },
            { "dsn": "postgres://app@db-3/orders", "buckets": [{ "from": 5, "to": 7 }] }
        ]
    }"#;

    #[test]
    fn test_parse_with_pool_defaults() {
        let config = ClusterConfig::from_json_str(THREE_SHARDS).unwrap();
        assert_eq!(config.bucket_count, 6);
        assert_eq!(config.shards.len(), 3);
        assert_eq!(config.pool, PoolSettings::default());
        assert_eq!(config.pool.acquire_timeout(), Duration::from_secs(30));
        assert!(config.overlapping_buckets().is_empty());
        assert!(config.unassigned_buckets().is_empty());
    }

    #[test]
    fn test_partial_pool_settings() {
        let config = ClusterConfig::from_json_str(
            r#"{
                "bucket_count": 1,
                "pool": { "max_connections": 4 },
                "shards": [{ "dsn": "postgres://db/x", "buckets": [{ "from": 1, "to": 2 }] }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.pool.max_connections, 4);
        assert_eq!(config.pool.min_connections, 2);
        assert_eq!(config.pool.idle_timeout_secs, 300);
    }

    #[test]
    fn test_zero_bucket_count_is_rejected() {
        let err = ClusterConfig::from_json_str(
            r#"{ "bucket_count": 0, "shards": [{ "dsn": "postgres://db/x", "buckets": [] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "bucket_count"));
    }

    #[test]
    fn test_empty_shard_list_is_rejected() {
        let err = ClusterConfig::from_json_str(r#"{ "bucket_count": 4, "shards": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "shards"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = ClusterConfig::from_json_str("{ bucket_count: ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_env_dsn_resolution() {
        std::env::set_var("SHARDROUTE_TEST_ENV_DSN", "postgres://app@from-env/orders");
        let config = ClusterConfig::from_json_str(
            r#"{
                "bucket_count": 1,
                "shards": [{ "dsn": "${SHARDROUTE_TEST_ENV_DSN}", "buckets": [{ "from": 1, "to": 2 }] }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.shards[0].dsn.expose(), "postgres://app@from-env/orders");
    }

    #[test]
    fn test_missing_env_dsn_is_validation_error() {
        let err = ClusterConfig::from_json_str(
            r#"{
                "bucket_count": 1,
                "shards": [{ "dsn": "${SHARDROUTE_TEST_SURELY_UNSET}", "buckets": [] }]
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "shards[0].dsn"));
    }

    #[test]
    fn test_overlap_and_gap_reporting() {
        let config = ClusterConfig {
            bucket_count: 6,
            pool: PoolSettings::default(),
            shards: vec![
                BucketToShard::new("postgres://db-1/x", vec![BucketRange::new(1, 4)]),
                BucketToShard::new("postgres://db-2/x", vec![BucketRange::new(3, 5)]),
            ],
        };

        let overlaps = config.overlapping_buckets();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps.get(&Bucket::new(3)), Some(&vec![0, 1]));

        assert_eq!(config.unassigned_buckets(), vec![Bucket::new(5)..=Bucket::new(6)]);
        assert_eq!(config.unassigned_count(), 2);
    }

    #[test]
    fn test_gaps_between_and_around_ranges() {
        let config = ClusterConfig {
            bucket_count: 10,
            pool: PoolSettings::default(),
            shards: vec![
                BucketToShard::new("postgres://db-1/x", vec![BucketRange::new(6, 8), BucketRange::new(3, 4)]),
                BucketToShard::new("postgres://db-2/x", vec![BucketRange::new(7, 9), BucketRange::new(20, 30)]),
                BucketToShard::new("postgres://db-3/x", vec![BucketRange::new(5, 5)]),
            ],
        };

        assert_eq!(
            config.unassigned_buckets(),
            vec![
                Bucket::new(1)..=Bucket::new(2),
                Bucket::new(4)..=Bucket::new(5),
                Bucket::new(9)..=Bucket::new(10),
            ]
        );
        assert_eq!(config.unassigned_count(), 6);
    }

    #[test]
    fn test_gap_reporting_scales_with_records_not_bucket_count() {
        let config = ClusterConfig {
            bucket_count: u32::MAX,
            pool: PoolSettings::default(),
            shards: vec![BucketToShard::new("postgres://db-1/x", vec![BucketRange::new(1, 2)])],
        };

        assert_eq!(config.unassigned_buckets(), vec![Bucket::new(2)..=Bucket::new(u32::MAX)]);
        assert_eq!(config.unassigned_count(), u64::from(u32::MAX) - 1);
    }

    #[test]
    fn test_largest_bucket_is_reported_when_unowned() {
        let config = ClusterConfig {
            bucket_count: u32::MAX,
            pool: PoolSettings::default(),
            shards: vec![BucketToShard::new("postgres://db-1/x", vec![BucketRange::new(1, u32::MAX)])],
        };

        assert_eq!(config.unassigned_buckets(), vec![Bucket::new(u32::MAX)..=Bucket::new(u32::MAX)]);
        assert_eq!(config.unassigned_count(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(THREE_SHARDS.as_bytes()).unwrap();

        let config = ClusterConfig::load(file.path()).unwrap();
        assert_eq!(config.shards[2].dsn.expose(), "postgres://app@db-3/orders");
    }

    #[test]
    fn test_unreadable_path_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClusterConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }), "unexpected error: {}", err);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClusterConfig::load("/definitely/not/here/cluster.json").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
