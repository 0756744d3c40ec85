//! Request dispatch between transports.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Route::for_request (typed flag, decided at build time)
//!     → Default:   DefaultTransport::dispatch → Response (untouched)
//!     → Alternate: SessionManager::checkout
//!                  → BlockingBridge::run(session.execute)
//!                  → ResponseNormalizer::normalize → Response
//! ```
//!
//! # Design Decisions
//! - No fallback: an alternate request without a live session fails
//! - Errors are wrapped with route and request ID, never translated
//! - The only suspension point on the alternate route is the bridge

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::bridge::BlockingBridge;
use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult, SessionError};
use crate::http::{Request, Response};
use crate::lifecycle::{EngineSignals, SessionManager};
use crate::normalize::{ResponseNormalizer, ResponseTypes};
use crate::observability::metrics;
use crate::transport::{DefaultTransport, Route, SessionFactory};

/// Entry point for every outbound fetch.
pub struct Dispatcher {
    default: Arc<dyn DefaultTransport>,
    sessions: Arc<SessionManager>,
    bridge: BlockingBridge,
    normalizer: ResponseNormalizer,
}

impl Dispatcher {
    /// Build a dispatcher from configuration.
    pub fn new(
        default: Arc<dyn DefaultTransport>,
        factory: Arc<dyn SessionFactory>,
        config: &DispatchConfig,
    ) -> Self {
        let bridge = BlockingBridge::new(config.bridge.max_in_flight);
        let sessions = Arc::new(SessionManager::new(
            factory,
            Duration::from_secs(config.session.drain_timeout_secs),
        ));
        let normalizer = ResponseNormalizer::new(
            Arc::new(ResponseTypes),
            config.session.provenance_flag.clone(),
        );
        Self::from_parts(default, sessions, bridge, normalizer)
    }

    /// Assemble a dispatcher from already-built components.
    pub fn from_parts(
        default: Arc<dyn DefaultTransport>,
        sessions: Arc<SessionManager>,
        bridge: BlockingBridge,
        normalizer: ResponseNormalizer,
    ) -> Self {
        Self {
            default,
            sessions,
            bridge,
            normalizer,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Open the alternate transport's session (engine started).
    pub async fn start(&self) -> Result<(), SessionError> {
        self.sessions.start().await
    }

    /// Release the alternate transport's session (handler closed).
    pub async fn close(&self) {
        self.sessions.stop().await
    }

    /// Drive the session lifecycle from engine events.
    pub fn subscribe(&self, signals: &EngineSignals) -> JoinHandle<()> {
        self.sessions.subscribe(signals)
    }

    /// Fetch `request` through the transport its flag selects.
    pub async fn dispatch(&self, request: impl Into<Arc<Request>>) -> DispatchResult<Response> {
        let request = request.into();
        let route = Route::for_request(&request);
        let started = Instant::now();

        tracing::debug!(
            request_id = %request.id(),
            route = %route,
            method = %request.method(),
            url = %request.url(),
            "Dispatching request"
        );

        let result = match route {
            Route::Default => self.dispatch_default(Arc::clone(&request)).await,
            Route::Alternate => self.dispatch_alternate(Arc::clone(&request)).await,
        };

        match &result {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request.id(),
                    route = %route,
                    status = %response.status(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Request completed"
                );
                metrics::record_dispatch(route, "ok", started);
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id(),
                    route = %route,
                    error = %e,
                    "Request failed"
                );
                let outcome = if e.is_configuration() { "config_error" } else { "error" };
                metrics::record_dispatch(route, outcome, started);
            }
        }

        result
    }

    async fn dispatch_default(&self, request: Arc<Request>) -> DispatchResult<Response> {
        let request_id = request.id();
        let url = request.url().clone();
        self.default
            .dispatch(request)
            .await
            .map_err(|source| DispatchError::Transport {
                route: Route::Default,
                request_id,
                url,
                source,
            })
    }

    async fn dispatch_alternate(&self, request: Arc<Request>) -> DispatchResult<Response> {
        let lease = self
            .sessions
            .checkout()
            .map_err(|source| DispatchError::Session {
                request_id: request.id(),
                url: request.url().clone(),
                source,
            })?;

        let worker_request = Arc::clone(&request);
        let raw = self
            .bridge
            .run(move || lease.execute(&worker_request))
            .await
            .map_err(|source| DispatchError::Transport {
                route: Route::Alternate,
                request_id: request.id(),
                url: request.url().clone(),
                source,
            })?;

        let request_id = request.id();
        let url = request.url().clone();
        self.normalizer
            .normalize(raw, request)
            .map_err(|source| DispatchError::Normalize {
                request_id,
                url,
                source,
            })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sessions", &self.sessions)
            .field("bridge", &self.bridge)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}
