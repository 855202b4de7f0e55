//! Flattening configuration records into the bucket → shard map.

use futures::future::join_all;
use shardroute_types::{Bucket, BucketToShard, PoolSettings};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ClusterError, ClusterResult};
use crate::pool::ShardPool;
use crate::shard::Shard;

pub(crate) struct Topology<P> {
    pub buckets: BTreeMap<Bucket, Shard<P>>,
    /// One entry per distinct DSN, in first-seen order.
    pub shards: Vec<Shard<P>>,
}

impl<P: ShardPool> Topology<P> {
    /// Open one pool per distinct DSN and assign buckets in record order.
    ///
    /// A later record overwrites an earlier one's claim on the same bucket.
    /// If a pool cannot be created, the pools opened so far are closed.
    pub async fn build(records: &[BucketToShard], settings: &PoolSettings) -> ClusterResult<Self> {
        let mut topology = Self { buckets: BTreeMap::new(), shards: Vec::new() };

        for record in records {
            let existing = topology.shards.iter().find(|s| s.dsn() == &record.dsn).cloned();
            let shard = match existing {
                Some(shard) => shard,
                None => match P::connect(&record.dsn, settings).await {
                    Ok(pool) => {
                        debug!(dsn = %record.dsn, "Shard pool created");
                        let shard = Shard::new(record.dsn.clone(), Arc::new(pool));
                        topology.shards.push(shard.clone());
                        shard
                    },
                    Err(err) => {
                        topology.close().await;
                        return Err(ClusterError::PoolCreation {
                            dsn: record.dsn.redacted(),
                            source: Box::new(err),
                        });
                    },
                },
            };

            for bucket in record.flattened() {
                if let Some(previous) = topology.buckets.insert(bucket, shard.clone()) {
                    if previous.dsn() != shard.dsn() {
                        warn!(
                            bucket = %bucket,
                            previous = %previous.dsn(),
                            current = %shard.dsn(),
                            "Bucket claimed by more than one shard, last record wins"
                        );
                    }
                }
            }
        }

        Ok(topology)
    }

    /// Close every distinct pool once.
    pub async fn close(&self) {
        join_all(self.shards.iter().map(|shard| shard.pool().close())).await;
    }
}
