//! Tracks live sessions and drives graceful/forceful shutdown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::CoreError;

/// A handle capable of forcing a tracked session to stop.
pub trait Stopper: Send + Sync {
    /// Forces the session to terminate. Must be idempotent.
    fn stop(&self);
}

struct Inner {
    stoppers: HashMap<u64, Box<dyn Stopper>>,
    in_shutdown: bool,
}

/// Tracks live sessions via opaque [`Stopper`] handles; coordinates the
/// two-phase graceful shutdown protocol (`close` then `shutdown`).
pub struct ConnectionManager {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl ConnectionManager {
    /// Creates an empty manager, not yet in shutdown.
    #[must_use]
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            inner: Mutex::new(Inner { stoppers: HashMap::new(), in_shutdown: false }),
            next_id: AtomicU64::new(0),
            done_tx,
            done_rx,
        }
    }

    /// Registers a stopper, returning a handle used to deregister it later.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ManagerClosed`] if shutdown has already begun.
    #[allow(clippy::expect_used)]
    pub fn track(&self, stopper: Box<dyn Stopper>) -> Result<u64, CoreError> {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        if inner.in_shutdown {
            return Err(CoreError::ManagerClosed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        inner.stoppers.insert(id, stopper);
        Ok(id)
    }

    /// Deregisters a previously tracked session. Signals `done` if shutdown
    /// is in progress and this was the last tracked session.
    #[allow(clippy::expect_used)]
    pub fn untrack(&self, id: u64) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.stoppers.remove(&id);
        if inner.in_shutdown && inner.stoppers.is_empty() {
            let _ = self.done_tx.send(true);
        }
    }

    /// Idempotently marks the manager as shutting down. Signals `done`
    /// immediately if nothing is tracked.
    #[allow(clippy::expect_used)]
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.in_shutdown = true;
        if inner.stoppers.is_empty() {
            let _ = self.done_tx.send(true);
        }
    }

    /// Marks the manager as shutting down and forcefully stops every
    /// currently tracked session.
    #[allow(clippy::expect_used)]
    pub fn shutdown(&self) {
        let mut inner = self.inner.lock().expect("connection manager mutex poisoned");
        inner.in_shutdown = true;
        if inner.stoppers.is_empty() {
            let _ = self.done_tx.send(true);
            return;
        }
        for stopper in inner.stoppers.values() {
            stopper.stop();
        }
    }

    /// Resolves once the last tracked session has deregistered after
    /// [`ConnectionManager::close`] or [`ConnectionManager::shutdown`].
    pub async fn done(&self) {
        let mut rx = self.done_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    /// Runs the host-facing graceful shutdown protocol: close, wait up to
    /// `grace_period` for every session to drain, then force-stop stragglers.
    pub async fn graceful_shutdown(&self, grace_period: Duration) {
        self.close();
        if tokio::time::timeout(grace_period, self.done()).await.is_err() {
            tracing::warn!("graceful shutdown grace period elapsed; forcing remaining sessions closed");
            self.shutdown();
            self.done().await;
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
