//! A physical shard: DSN plus its shared connection pool.

use shardroute_types::{Bucket, Dsn};
use std::fmt;
use std::sync::Arc;

use crate::bucket_pool::BucketPool;
use crate::pool::ShardPool;

/// One shard. Every bucket owned by the shard holds a clone of the same
/// `Arc`, so the pool is shared rather than duplicated.
pub struct Shard<P> {
    dsn: Dsn,
    pool: Arc<P>,
}

impl<P: ShardPool> Shard<P> {
    pub(crate) fn new(dsn: Dsn, pool: Arc<P>) -> Self {
        Self { dsn, pool }
    }

    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// The shard's pool, for queries that are not bucket-scoped.
    ///
    /// Owned by the cluster; only [`ShardCluster::close`](crate::ShardCluster::close) closes it.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Schema-scoped view of this shard's pool.
    pub fn bucket_pool(&self, bucket: Bucket) -> BucketPool<P> {
        BucketPool::new(bucket, Arc::clone(&self.pool))
    }

    /// True when both shards use the same pool instance.
    pub fn same_pool(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.pool, &other.pool)
    }
}

impl<P> Clone for Shard<P> {
    fn clone(&self) -> Self {
        Self { dsn: self.dsn.clone(), pool: Arc::clone(&self.pool) }
    }
}

impl<P> fmt::Debug for Shard<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shard").field("dsn", &self.dsn).finish_non_exhaustive()
    }
}
