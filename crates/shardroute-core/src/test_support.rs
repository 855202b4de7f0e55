//! In-memory [`ShardPool`] for unit tests.
//!
//! Behaviour is selected by substrings of the DSN:
//! - `fail-connect`: pool creation fails
//! - `fail-ping`: the liveness probe fails
//! - `slow-ping`: the liveness probe takes 50ms
//!
//! Queries starting with `FAIL` are rejected. Every other query succeeds and
//! echoes the text and arguments it received as a single row.
//!
//! Pools created through [`ShardPool::connect`] are recorded per DSN so tests
//! can inspect them after the cluster is gone; use unique DSNs per test.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use shardroute_types::{Dsn, PoolSettings};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::pool::ShardPool;

static REGISTRY: Mutex<BTreeMap<String, Vec<Arc<MockState>>>> =
    parking_lot::const_mutex(BTreeMap::new());

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockRow {
    pub sql: String,
    pub args: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("mock driver error: {0}")]
pub(crate) struct MockError(pub String);

#[derive(Debug, Default)]
pub(crate) struct MockState {
    executed: Mutex<Vec<MockRow>>,
    pings: AtomicUsize,
    closes: AtomicUsize,
}

impl MockState {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct MockPool {
    dsn: String,
    state: Arc<MockState>,
}

impl MockPool {
    /// A pool that is not recorded in the registry.
    pub fn detached(dsn: &str) -> Self {
        Self { dsn: dsn.to_string(), state: Arc::default() }
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn executed(&self) -> Vec<MockRow> {
        self.state.executed.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.close_count()
    }

    fn run(&self, sql: &str, args: Vec<String>) -> Result<MockRow, MockError> {
        if sql.starts_with("FAIL") {
            return Err(MockError(format!("rejected query: {}", sql)));
        }
        let row = MockRow { sql: sql.to_string(), args };
        self.state.executed.lock().push(row.clone());
        Ok(row)
    }
}

/// Pools created for `dsn`, in creation order.
pub(crate) fn pools_for(dsn: &str) -> Vec<Arc<MockState>> {
    REGISTRY.lock().get(dsn).cloned().unwrap_or_default()
}

pub(crate) fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[async_trait]
impl ShardPool for MockPool {
    type Arguments = Vec<String>;
    type QueryResult = u64;
    type Row = MockRow;
    type Error = MockError;

    async fn connect(dsn: &Dsn, _settings: &PoolSettings) -> Result<Self, MockError> {
        let raw = dsn.expose();
        if raw.contains("fail-connect") {
            return Err(MockError(format!("invalid dsn: {}", raw)));
        }
        let state = Arc::new(MockState::default());
        REGISTRY.lock().entry(raw.to_string()).or_default().push(Arc::clone(&state));
        Ok(Self { dsn: raw.to_string(), state })
    }

    async fn ping(&self) -> Result<(), MockError> {
        self.state.pings.fetch_add(1, Ordering::SeqCst);
        if self.dsn.contains("slow-ping") {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        if self.dsn.contains("fail-ping") {
            return Err(MockError(format!("connection refused: {}", self.dsn)));
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }

    async fn execute(&self, sql: &str, args: Vec<String>) -> Result<u64, MockError> {
        self.run(sql, args).map(|_| 1)
    }

    fn fetch(&self, sql: String, args: Vec<String>) -> BoxStream<'static, Result<MockRow, MockError>> {
        stream::iter(vec![self.run(&sql, args)]).boxed()
    }

    async fn fetch_all(&self, sql: &str, args: Vec<String>) -> Result<Vec<MockRow>, MockError> {
        self.run(sql, args).map(|row| vec![row])
    }

    async fn fetch_one(&self, sql: &str, args: Vec<String>) -> Result<MockRow, MockError> {
        self.run(sql, args)
    }
}
