//! Blocking-call bridge.
//!
//! # Data Flow
//! ```text
//! async caller
//!     → BlockingBridge::run(work)
//!     → (optional) wait for a concurrency permit
//!     → tokio::task::spawn_blocking(work)   ← runs on the blocking pool
//!     → caller suspended on the JoinHandle
//!     → result / error / panic delivered back on the caller's task
//! ```
//!
//! # Design Decisions
//! - Exactly one execution per submitted closure
//! - Blocking work is never interrupted; dropping the awaiting future
//!   detaches the worker, which runs to completion and has its result dropped
//! - Panics inside the worker come back as `TransportError::WorkerPanicked`
//! - The permit and gauge guards live inside the worker closure, so they
//!   track the worker's lifetime, not the caller's

use std::any::Any;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::observability::metrics;
use crate::transport::TransportError;

/// Runs blocking closures off the async scheduler.
#[derive(Debug, Clone, Default)]
pub struct BlockingBridge {
    permits: Option<Arc<Semaphore>>,
}

impl BlockingBridge {
    /// Create a bridge. `max_in_flight` bounds how many submitted closures
    /// may run at once; `None` defers to the runtime's blocking pool.
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            permits: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
        }
    }

    /// Bridge with no bound of its own.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Permits currently free, or `None` for an unbounded bridge.
    pub fn available_permits(&self) -> Option<usize> {
        self.permits.as_ref().map(|s| s.available_permits())
    }

    /// Run `work` on a worker thread and await its result.
    pub async fn run<F, T>(&self, work: F) -> Result<T, TransportError>
    where
        F: FnOnce() -> Result<T, TransportError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = match &self.permits {
            Some(semaphore) => Some(
                semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| TransportError::WorkerCancelled)?,
            ),
            None => None,
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _gauge = metrics::BlockingGauge::enter();
            work()
        });

        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                let message = panic_message(e.into_panic());
                tracing::error!(panic = %message, "Blocking worker panicked");
                Err(TransportError::WorkerPanicked(message))
            }
            Err(_) => Err(TransportError::WorkerCancelled),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
