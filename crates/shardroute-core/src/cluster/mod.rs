//! Shard cluster: topology, routing lookups, fan-out and lifecycle.
//!
//! A [`ShardCluster`] is built once from an ordered list of
//! [`BucketToShard`] records and is immutable afterwards, so lookups from
//! many tasks need no locking. Share it behind an `Arc`.
//!
//! Construction either fully succeeds (every shard answered its probe) or
//! closes every pool it opened before returning the error.

mod fanout;
mod topology;

use shardroute_types::{Bucket, BucketToShard, ClusterConfig, ConfigError, PoolSettings};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bucket_pool::BucketPool;
use crate::error::{BoxError, ClusterError, ClusterResult};
use crate::hashing::{HashingKeyToBucket, KeyToBucket};
use crate::pool::ShardPool;
use crate::shard::Shard;
use fanout::{fan_out, FanOutFailure};
use topology::Topology;

/// Routes keys and buckets to shard pools.
pub struct ShardCluster<P: ShardPool = PgPool> {
    key_to_bucket: Box<dyn KeyToBucket>,
    buckets: BTreeMap<Bucket, Shard<P>>,
    shards: Vec<Shard<P>>,
    closed: AtomicBool,
}

impl<P: ShardPool> ShardCluster<P> {
    /// Build the cluster: open one pool per distinct DSN, map buckets to
    /// shards in record order (later records win on overlap), then probe
    /// every shard concurrently.
    ///
    /// Cancelling `cancel` aborts the probe; the pools are closed and
    /// [`ClusterError::Cancelled`] is returned.
    pub async fn connect<K>(
        key_to_bucket: K,
        records: &[BucketToShard],
        settings: &PoolSettings,
        cancel: &CancellationToken,
    ) -> ClusterResult<Self>
    where
        K: KeyToBucket + 'static,
    {
        let topology = Topology::<P>::build(records, settings).await?;

        if let Err(err) = probe(&topology, cancel).await {
            warn!(error = %err, "Shard probe failed, closing all pools");
            topology.close().await;
            return Err(err);
        }

        info!(
            shards = topology.shards.len(),
            buckets = topology.buckets.len(),
            "Shard cluster ready"
        );

        Ok(Self {
            key_to_bucket: Box::new(key_to_bucket),
            buckets: topology.buckets,
            shards: topology.shards,
            closed: AtomicBool::new(false),
        })
    }

    /// Validate `config` and build a cluster hashing keys into
    /// `1..=config.bucket_count`.
    pub async fn from_config(config: &ClusterConfig, cancel: &CancellationToken) -> ClusterResult<Self> {
        config.check()?;
        let hasher = HashingKeyToBucket::with_bucket_count(config.bucket_count).ok_or_else(|| {
            ConfigError::ValidationError {
                field: "bucket_count".to_string(),
                message: "must be at least 1".to_string(),
            }
        })?;

        let overlaps = config.overlapping_buckets();
        if !overlaps.is_empty() {
            warn!(count = overlaps.len(), "Configuration assigns some buckets more than once");
        }
        let unassigned = config.unassigned_buckets();
        if let Some(first_gap) = unassigned.first() {
            warn!(
                count = config.unassigned_count(),
                first = %first_gap.start(),
                "Some hash-reachable buckets have no shard"
            );
        }

        Self::connect(hasher, &config.shards, &config.pool, cancel).await
    }

    /// Bucket a key hashes to. Never fails.
    pub fn bucket_of(&self, key: &str) -> Bucket {
        self.key_to_bucket.bucket_of(key)
    }

    /// Schema-scoped pool for the bucket `key` hashes to.
    pub fn pool_for(&self, key: &str) -> ClusterResult<BucketPool<P>> {
        self.pool_for_bucket(self.bucket_of(key))
    }

    /// Schema-scoped pool for a known bucket.
    pub fn pool_for_bucket(&self, bucket: Bucket) -> ClusterResult<BucketPool<P>> {
        self.shard_for_bucket(bucket).map(|shard| shard.bucket_pool(bucket))
    }

    pub fn shard_for_bucket(&self, bucket: Bucket) -> ClusterResult<&Shard<P>> {
        self.buckets.get(&bucket).ok_or(ClusterError::NoSuchShard { bucket })
    }

    /// Distinct shards in configuration order. The returned list is a copy.
    pub fn shards(&self) -> Vec<Shard<P>> {
        self.shards.clone()
    }

    /// Mapped buckets in ascending order.
    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.buckets.keys().copied()
    }

    /// Number of mapped buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Run `callback` once per distinct shard, concurrently.
    ///
    /// The first failure cancels the token handed to the other callbacks;
    /// the call still waits for every callback to finish and then returns
    /// that first failure.
    pub async fn for_each_shard<F, Fut, E>(
        &self,
        cancel: &CancellationToken,
        callback: F,
    ) -> ClusterResult<()>
    where
        F: Fn(CancellationToken, Shard<P>) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        debug!(shards = self.shards.len(), "Fan-out over shards");
        fan_out(cancel, self.shards.iter().cloned(), callback)
            .await
            .map_err(|failure| failure.into_cluster_error("each shard"))
    }

    /// Run `callback` once per mapped bucket with a schema-scoped pool,
    /// concurrently. Buckets sharing a shard each get their own call.
    ///
    /// Same cancellation and error semantics as [`Self::for_each_shard`].
    pub async fn for_each_bucket<F, Fut, E>(
        &self,
        cancel: &CancellationToken,
        callback: F,
    ) -> ClusterResult<()>
    where
        F: Fn(CancellationToken, BucketPool<P>) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        debug!(buckets = self.buckets.len(), "Fan-out over buckets");
        let targets = self.buckets.iter().map(|(bucket, shard)| shard.bucket_pool(*bucket));
        fan_out(cancel, targets, callback)
            .await
            .map_err(|failure| failure.into_cluster_error("each bucket"))
    }

    /// Close every shard pool once. Later calls do nothing.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Shard cluster already closed");
            return;
        }
        for shard in &self.shards {
            shard.pool().close().await;
        }
        info!(shards = self.shards.len(), "Shard cluster closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

async fn probe<P: ShardPool>(topology: &Topology<P>, cancel: &CancellationToken) -> ClusterResult<()> {
    let result = fan_out(cancel, topology.shards.iter().cloned(), |cancel, shard: Shard<P>| async move {
        tokio::select! {
            result = shard.pool().ping() => result.map_err(|err| ClusterError::Unreachable {
                dsn: shard.dsn().redacted(),
                source: Box::new(err),
            }),
            () = cancel.cancelled() => Err(ClusterError::Cancelled),
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(FanOutFailure::Callback(err)) => Err(err),
        Err(panicked @ FanOutFailure::Panicked(_)) => Err(panicked.into_cluster_error("shard probe")),
    }
}

impl<P: ShardPool> fmt::Debug for ShardCluster<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardCluster")
            .field("shards", &self.shards)
            .field("buckets", &self.buckets.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
