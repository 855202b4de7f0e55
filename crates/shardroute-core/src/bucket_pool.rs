//! Schema-scoped executor for one bucket.
//!
//! Queries are written against the reserved `_bucket_` schema token, e.g.
//! `SELECT * FROM _bucket_.users WHERE id = $1`. Before dispatch every
//! occurrence of the token is replaced with the bucket's schema
//! (`bucket_7.users`). The replacement is a plain substring substitution:
//! the token must not appear anywhere else in the query text, including
//! string literals and longer identifiers.

use futures::stream::BoxStream;
use shardroute_types::{Bucket, SCHEMA_PLACEHOLDER};
use std::fmt;
use std::sync::Arc;

use crate::pool::ShardPool;

/// Shard pool view scoped to a single bucket's schema.
///
/// Cheap to build and clone. It shares the shard's pool and never closes it.
pub struct BucketPool<P> {
    bucket: Bucket,
    schema: String,
    pool: Arc<P>,
}

impl<P: ShardPool> BucketPool<P> {
    pub fn new(bucket: Bucket, pool: Arc<P>) -> Self {
        Self { bucket, schema: bucket.schema_name(), pool }
    }

    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Query text as it will be sent to the shard.
    pub fn qualify(&self, sql: &str) -> String {
        sql.replace(SCHEMA_PLACEHOLDER, &self.schema)
    }

    pub async fn execute(&self, sql: &str, args: P::Arguments) -> Result<P::QueryResult, P::Error> {
        self.pool.execute(&self.qualify(sql), args).await
    }

    pub fn fetch(&self, sql: &str, args: P::Arguments) -> BoxStream<'static, Result<P::Row, P::Error>> {
        self.pool.fetch(self.qualify(sql), args)
    }

    pub async fn fetch_all(&self, sql: &str, args: P::Arguments) -> Result<Vec<P::Row>, P::Error> {
        self.pool.fetch_all(&self.qualify(sql), args).await
    }

    pub async fn fetch_one(&self, sql: &str, args: P::Arguments) -> Result<P::Row, P::Error> {
        self.pool.fetch_one(&self.qualify(sql), args).await
    }

    #[cfg(test)]
    pub(crate) fn shares_pool(&self, pool: &Arc<P>) -> bool {
        Arc::ptr_eq(&self.pool, pool)
    }
}

impl<P> Clone for BucketPool<P> {
    fn clone(&self) -> Self {
        Self { bucket: self.bucket, schema: self.schema.clone(), pool: Arc::clone(&self.pool) }
    }
}

impl<P> fmt::Debug for BucketPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketPool").field("bucket", &self.bucket).field("schema", &self.schema).finish()
    }
}
