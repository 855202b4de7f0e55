//! Concurrent fan-out with first-error cancellation.
//!
//! One task per target is spawned on a [`JoinSet`]. Every task receives a
//! child of the caller's [`CancellationToken`]; the first failure (in
//! completion order) cancels it so siblings can stop at their next await
//! point. All tasks are joined before returning, never aborted. A panic in
//! the callback closure itself (not in its future) propagates to the caller
//! before any task is spawned.

use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{BoxError, ClusterError};

#[derive(Debug)]
pub(crate) enum FanOutFailure<E> {
    Callback(E),
    Panicked(JoinError),
}

impl<E: Into<BoxError>> FanOutFailure<E> {
    pub fn into_cluster_error(self, scope: &'static str) -> ClusterError {
        let source = match self {
            Self::Callback(err) => err.into(),
            Self::Panicked(err) => Box::new(err) as BoxError,
        };
        ClusterError::FanOut { scope, source }
    }
}

pub(crate) async fn fan_out<T, F, Fut, E>(
    parent: &CancellationToken,
    targets: impl IntoIterator<Item = T>,
    callback: F,
) -> Result<(), FanOutFailure<E>>
where
    F: Fn(CancellationToken, T) -> Fut,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Send + 'static,
{
    let cancel = parent.child_token();
    // Build every future first: a panicking closure then unwinds before any
    // task exists.
    let futures: Vec<Fut> = targets.into_iter().map(|target| callback(cancel.clone(), target)).collect();

    let mut tasks = JoinSet::new();
    for future in futures {
        tasks.spawn(future);
    }

    let mut first_failure = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => FanOutFailure::Callback(err),
            Err(err) => FanOutFailure::Panicked(err),
        };
        if first_failure.is_none() {
            debug!(remaining = tasks.len(), "Fan-out callback failed, cancelling siblings");
            cancel.cancel();
            first_failure = Some(failure);
        }
    }

    first_failure.map_or(Ok(()), Err)
}
