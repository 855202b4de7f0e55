//! PostgreSQL implementation of the shard pool.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use shardroute_types::{Dsn, PoolSettings};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgQueryResult, PgRow};
use sqlx::Connection;

use super::ShardPool;

#[async_trait]
impl ShardPool for PgPool {
    type Arguments = PgArguments;
    type QueryResult = PgQueryResult;
    type Row = PgRow;
    type Error = sqlx::Error;

    async fn connect(dsn: &Dsn, settings: &PoolSettings) -> Result<Self, sqlx::Error> {
        tracing::debug!(dsn = %dsn, max_connections = settings.max_connections, "Creating shard pool");
        PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.acquire_timeout())
            .idle_timeout(settings.idle_timeout())
            .connect_lazy(dsn.expose())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.acquire().await?;
        conn.ping().await
    }

    async fn close(&self) {
        sqlx::Pool::close(self).await;
    }

    async fn execute(&self, sql: &str, args: PgArguments) -> Result<PgQueryResult, sqlx::Error> {
        sqlx::query_with(sql, args).execute(self).await
    }

    fn fetch(&self, sql: String, args: PgArguments) -> BoxStream<'static, Result<PgRow, sqlx::Error>> {
        let pool = self.clone();
        async_stream::try_stream! {
            let mut rows = sqlx::query_with(&sql, args).fetch(&pool);
            while let Some(row) = rows.try_next().await? {
                yield row;
            }
        }
        .boxed()
    }

    async fn fetch_all(&self, sql: &str, args: PgArguments) -> Result<Vec<PgRow>, sqlx::Error> {
        sqlx::query_with(sql, args).fetch_all(self).await
    }

    async fn fetch_one(&self, sql: &str, args: PgArguments) -> Result<PgRow, sqlx::Error> {
        sqlx::query_with(sql, args).fetch_one(self).await
    }
}
