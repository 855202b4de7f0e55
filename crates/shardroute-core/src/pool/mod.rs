//! Pooled database client seam.
//!
//! The cluster only needs a handful of operations from a shard's pool:
//! construction from a DSN, a liveness probe, teardown, and three flavours
//! of query execution. [`ShardPool`] captures exactly that, with the
//! PostgreSQL implementation in [`postgres`].

mod postgres;

use async_trait::async_trait;
use futures::stream::BoxStream;
use shardroute_types::{Dsn, PoolSettings};

/// Connection pool for one shard. Must be safe for concurrent use.
#[async_trait]
pub trait ShardPool: Sized + Send + Sync + 'static {
    /// Positional query parameters.
    type Arguments: Send + 'static;
    /// Outcome of a statement that returns no rows.
    type QueryResult: Send;
    /// One decoded row.
    type Row: Send + 'static;
    /// Driver error.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a pool for `dsn`. Must not require the server to be reachable.
    async fn connect(dsn: &Dsn, settings: &PoolSettings) -> Result<Self, Self::Error>;

    /// One lightweight round trip to the server.
    async fn ping(&self) -> Result<(), Self::Error>;

    /// Close every connection of the pool.
    async fn close(&self);

    async fn execute(
        &self,
        sql: &str,
        args: Self::Arguments,
    ) -> Result<Self::QueryResult, Self::Error>;

    /// Row stream; owns the query text for the lifetime of the stream.
    fn fetch(
        &self,
        sql: String,
        args: Self::Arguments,
    ) -> BoxStream<'static, Result<Self::Row, Self::Error>>;

    async fn fetch_all(&self, sql: &str, args: Self::Arguments)
        -> Result<Vec<Self::Row>, Self::Error>;

    /// Exactly one row; an empty result is a driver error.
    async fn fetch_one(&self, sql: &str, args: Self::Arguments) -> Result<Self::Row, Self::Error>;
}
