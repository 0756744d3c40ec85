//! Client session lifecycle.
//!
//! # State Transitions
//! ```text
//! Idle → Starting → Running → Closed
//!   │        │                  ▲
//!   │        └── open failed → Idle
//!   └──────────── stop ─────────┘
//! ```
//!
//! # Design Decisions
//! - One session per manager; a second start is an error, never a swap
//! - Readers check out the session together with an in-flight guard under
//!   the same lock, so stop either sees the call or the call sees Closed
//! - Stop closes the door first, drains in-flight work up to a deadline,
//!   then releases the session on a worker thread
//! - Opening and releasing happen on the blocking pool: session backends
//!   are allowed to block in both
//! - Lifecycle work runs on its own unbounded bridge, so a permit held by a
//!   straggling request never delays open or release

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::bridge::BlockingBridge;
use crate::error::SessionError;
use crate::http::Request;
use crate::lifecycle::inflight::{InFlightGuard, InFlightTracker};
use crate::lifecycle::signals::{EngineEvent, EngineSignals};
use crate::transport::{ClientSession, RawResponse, SessionFactory, TransportError};

enum SessionState {
    Idle,
    Starting,
    Running(Arc<dyn ClientSession>),
    Closed,
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Starting,
    Running,
    Closed,
}

/// Owns the shared client session used by the alternate transport.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    state: RwLock<SessionState>,
    inflight: InFlightTracker,
    lifecycle: BlockingBridge,
    drain_timeout: Duration,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn SessionFactory>, drain_timeout: Duration) -> Self {
        Self {
            factory,
            state: RwLock::new(SessionState::Idle),
            inflight: InFlightTracker::new(),
            lifecycle: BlockingBridge::unbounded(),
            drain_timeout,
        }
    }

    /// Open the session. Called once, when the engine reports it started.
    ///
    /// A second call fails with [`SessionError::AlreadyStarted`] and leaves
    /// the running session untouched. If this future is dropped while the
    /// session is opening, the manager stays in `Starting` until stopped.
    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut state = self.write();
            match &*state {
                SessionState::Idle => {}
                SessionState::Closed => return Err(SessionError::Closed),
                SessionState::Starting | SessionState::Running(_) => {
                    tracing::error!("Duplicate session initialization rejected");
                    return Err(SessionError::AlreadyStarted);
                }
            }
            *state = SessionState::Starting;
        }

        let factory = Arc::clone(&self.factory);
        let opened = self.lifecycle.run(move || factory.open()).await;

        let orphan = {
            let mut state = self.write();
            match opened {
                Ok(session) => {
                    if matches!(*state, SessionState::Starting) {
                        *state = SessionState::Running(session);
                        None
                    } else {
                        Some(session)
                    }
                }
                Err(e) => {
                    if matches!(*state, SessionState::Starting) {
                        *state = SessionState::Idle;
                    }
                    tracing::error!(error = %e, "Failed to open client session");
                    return Err(SessionError::Open(e));
                }
            }
        };

        match orphan {
            None => {
                tracing::info!("Client session started");
                Ok(())
            }
            Some(session) => {
                tracing::warn!("Session stopped while opening; releasing new session");
                self.release(session).await;
                Err(SessionError::Closed)
            }
        }
    }

    /// Close the session.
    ///
    /// New checkouts fail with [`SessionError::Closed`] as soon as this is
    /// called. Outstanding calls get up to the drain timeout to finish
    /// before the session is released. Safe to call before `start` and more
    /// than once.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.write(), SessionState::Closed);
        match previous {
            SessionState::Running(session) => {
                let outstanding = self.inflight.active();
                if outstanding > 0 {
                    tracing::info!(outstanding, "Draining in-flight session calls");
                }
                if !self.inflight.wait_idle(self.drain_timeout).await {
                    tracing::warn!(
                        outstanding = self.inflight.active(),
                        timeout = ?self.drain_timeout,
                        "Drain timed out; remaining calls keep their session handle"
                    );
                }
                self.release(session).await;
                tracing::info!("Client session closed");
            }
            SessionState::Idle | SessionState::Starting => {
                tracing::debug!("Stop before session start; nothing to release");
            }
            SessionState::Closed => {
                tracing::debug!("Session already closed");
            }
        }
    }

    /// The live session, or why there is none.
    pub fn current(&self) -> Result<Arc<dyn ClientSession>, SessionError> {
        match &*self.read() {
            SessionState::Running(session) => Ok(Arc::clone(session)),
            SessionState::Idle | SessionState::Starting => Err(SessionError::NotStarted),
            SessionState::Closed => Err(SessionError::Closed),
        }
    }

    /// Check out the live session for one call, counted as in flight until
    /// the returned lease is dropped.
    pub fn checkout(&self) -> Result<SessionLease, SessionError> {
        let state = self.read();
        match &*state {
            SessionState::Running(session) => Ok(SessionLease {
                session: Arc::clone(session),
                _guard: self.inflight.track(),
            }),
            SessionState::Idle | SessionState::Starting => Err(SessionError::NotStarted),
            SessionState::Closed => Err(SessionError::Closed),
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &*self.read() {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::Starting => SessionStatus::Starting,
            SessionState::Running(_) => SessionStatus::Running,
            SessionState::Closed => SessionStatus::Closed,
        }
    }

    /// Calls currently holding a lease.
    pub fn in_flight(&self) -> usize {
        self.inflight.active()
    }

    /// Follow engine events: `Started` opens the session, `Stopped` closes
    /// it and ends the listener.
    pub fn subscribe(self: &Arc<Self>, signals: &EngineSignals) -> JoinHandle<()> {
        let mut rx = signals.subscribe();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(EngineEvent::Started) => {
                        if let Err(e) = manager.start().await {
                            tracing::error!(error = %e, "Engine start notification rejected");
                        }
                    }
                    Ok(EngineEvent::Stopped) => {
                        manager.stop().await;
                        break;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Session listener lagged behind engine events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn release(&self, session: Arc<dyn ClientSession>) {
        let released = self
            .lifecycle
            .run(move || {
                session.close();
                Ok(())
            })
            .await;
        if let Err(e) = released {
            tracing::warn!(error = %e, "Client session release failed");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("status", &self.status())
            .field("in_flight", &self.in_flight())
            .field("drain_timeout", &self.drain_timeout)
            .finish()
    }
}

/// A checked-out session. Counts as in flight until dropped; move it into
/// the worker closure so the count follows the blocking call.
pub struct SessionLease {
    session: Arc<dyn ClientSession>,
    _guard: InFlightGuard,
}

impl SessionLease {
    pub fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        self.session.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    struct NullSession(Arc<Counters>);

    impl ClientSession for NullSession {
        fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
            Ok(RawResponse {
                status: 200,
                headers: Vec::new(),
                body: bytes::Bytes::new(),
                url: request.url().to_string(),
            })
        }

        fn close(&self) {
            self.0.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn manager() -> (Arc<SessionManager>, Arc<Counters>) {
        manager_with_drain(Duration::from_secs(1))
    }

    fn manager_with_drain(drain_timeout: Duration) -> (Arc<SessionManager>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let c = counters.clone();
        let factory = move || -> Result<Arc<dyn ClientSession>, TransportError> {
            c.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullSession(c.clone())))
        };
        let manager = SessionManager::new(Arc::new(factory), drain_timeout);
        (Arc::new(manager), counters)
    }

    #[tokio::test]
    async fn test_not_started() {
        let (manager, _) = manager();
        assert_eq!(manager.status(), SessionStatus::Idle);
        assert!(matches!(manager.current(), Err(SessionError::NotStarted)));
        assert!(matches!(manager.checkout(), Err(SessionError::NotStarted)));
    }

    #[tokio::test]
    async fn test_start_then_duplicate() {
        let (manager, counters) = manager();
        manager.start().await.unwrap();
        assert_eq!(manager.status(), SessionStatus::Running);
        let first = manager.current().unwrap();

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyStarted));
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &manager.current().unwrap()));
    }

    #[tokio::test]
    async fn test_stop_releases_once() {
        let (manager, counters) = manager();
        manager.start().await.unwrap();
        manager.stop().await;
        manager.stop().await;
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status(), SessionStatus::Closed);
        assert!(matches!(manager.current(), Err(SessionError::Closed)));
        assert!(matches!(manager.start().await, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn test_stop_drops_last_session_handle() {
        let (manager, counters) = manager();
        manager.start().await.unwrap();
        let weak = Arc::downgrade(&manager.current().unwrap());

        manager.stop().await;
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let (manager, counters) = manager();
        manager.stop().await;
        assert_eq!(counters.opened.load(Ordering::SeqCst), 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
        assert_eq!(manager.status(), SessionStatus::Closed);
    }

    #[tokio::test]
    async fn test_open_failure_returns_to_idle() {
        let factory = || -> Result<Arc<dyn ClientSession>, TransportError> {
            Err(TransportError::Connect("no route".into()))
        };
        let manager = SessionManager::new(Arc::new(factory), Duration::from_secs(1));
        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, SessionError::Open(TransportError::Connect(_))));
        assert_eq!(manager.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_lease_counts_in_flight() {
        let (manager, _) = manager();
        manager.start().await.unwrap();
        let lease = manager.checkout().unwrap();
        assert_eq!(manager.in_flight(), 1);
        let request = Request::get("http://x/").unwrap();
        assert_eq!(lease.execute(&request).unwrap().status, 200);
        drop(lease);
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_signals_drive_lifecycle() {
        let (manager, counters) = manager();
        let signals = EngineSignals::new();
        let listener = manager.subscribe(&signals);

        signals.send(EngineEvent::Started);
        signals.send(EngineEvent::Started);
        signals.send(EngineEvent::Stopped);
        listener.await.unwrap();

        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(manager.status(), SessionStatus::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_not_blocked_by_saturated_request_bridge() {
        let (manager, counters) = manager_with_drain(Duration::from_millis(50));
        manager.start().await.unwrap();

        let requests = BlockingBridge::new(Some(1));
        let lease = manager.checkout().unwrap();
        let straggler = {
            let requests = requests.clone();
            tokio::spawn(async move {
                requests
                    .run(move || {
                        std::thread::sleep(Duration::from_millis(800));
                        drop(lease);
                        Ok(())
                    })
                    .await
            })
        };
        while requests.available_permits() != Some(0) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let started = std::time::Instant::now();
        manager.stop().await;
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
        assert_eq!(manager.in_flight(), 1);

        straggler.await.unwrap().unwrap();
        assert_eq!(manager.in_flight(), 0);
    }
}
