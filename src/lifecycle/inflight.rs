//! In-flight work tracking.
//!
//! # Responsibilities
//! - Count blocking calls currently holding the client session
//! - Let session shutdown wait until that count drains to zero
//!
//! # Design Decisions
//! - RAII guard: the count drops when the worker finishes, even if the
//!   caller that submitted it was cancelled long before
//! - Waiting for idle always takes a deadline

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Tracks outstanding session calls.
#[derive(Debug, Clone)]
pub struct InFlightTracker {
    count: Arc<watch::Sender<usize>>,
}

impl InFlightTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Record one more outstanding call. The returned guard releases it.
    pub fn track(&self) -> InFlightGuard {
        self.count.send_modify(|n| *n += 1);
        InFlightGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Number of calls currently outstanding.
    pub fn active(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until no calls are outstanding or `deadline` passes.
    ///
    /// Returns `true` when drained.
    pub async fn wait_idle(&self, deadline: Duration) -> bool {
        let mut rx = self.count.subscribe();
        let drained = matches!(
            tokio::time::timeout(deadline, rx.wait_for(|n| *n == 0)).await,
            Ok(Ok(_))
        );
        drained
    }
}

impl Default for InFlightTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one outstanding call. Decrements the count on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    count: Arc<watch::Sender<usize>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.send_modify(|n| *n = n.saturating_sub(1));
    }
}
