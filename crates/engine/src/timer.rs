//! One-shot delayed callbacks.

use std::time::Duration;

use futures::future::BoxFuture;

/// Scheduling primitive: run `callback` once after `delay`.
///
/// Every call arms an independent timer; nothing is coalesced.
pub trait Timer: Send + Sync {
    fn run_once(&self, delay: Duration, callback: BoxFuture<'static, ()>);
}

/// Spawns a tokio task per armed timer. Must be called from within a
/// tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn run_once(&self, delay: Duration, callback: BoxFuture<'static, ()>) {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback.await;
        });
    }
}
