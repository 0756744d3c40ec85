//! Transport backends.
//!
//! # Data Flow
//! ```text
//! Route::Default:
//!     Arc<Request> → DefaultTransport::dispatch (async) → Response
//!
//! Route::Alternate:
//!     SessionFactory::open (once, at engine start) → Arc<dyn ClientSession>
//!     &Request → ClientSession::execute (blocking, worker thread) → RawResponse
//!     RawResponse → normalize → Response
//! ```
//!
//! # Design Decisions
//! - Two capabilities, one per route, instead of a shared base type
//! - The default transport already returns canonical responses
//! - Sessions are shared by every in-flight alternate request; thread
//!   safety of a session is the implementation's contract (`Send + Sync`)

pub mod blocking_session;
pub mod reqwest_default;

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::redirect;
use thiserror::Error;

use crate::http::{Request, Response};

pub use blocking_session::{BlockingSession, BlockingSessionFactory};
pub use reqwest_default::ReqwestTransport;

/// Which transport handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The engine's built-in async transport.
    Default,
    /// The session-based transport run through the blocking bridge.
    Alternate,
}

impl Route {
    /// Route selected by a request's flag.
    pub fn for_request(request: &Request) -> Self {
        if request.alternate_transport() {
            Route::Alternate
        } else {
            Route::Default
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Default => "default",
            Route::Alternate => "alternate",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network-level failures raised by either transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request could not be sent: {0}")]
    InvalidRequest(String),

    /// The blocking call panicked on its worker thread.
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),

    /// The worker was torn down (runtime shutdown) before it finished.
    #[error("worker cancelled before completion")]
    WorkerCancelled,
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidRequest(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// Response exactly as a session backend produced it.
///
/// Consumed once by the normalizer.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Header names with undecoded values, in wire order.
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Bytes,
    /// Effective URL; may differ from the request URL after redirects.
    pub url: String,
}

/// The engine's built-in transport.
pub trait DefaultTransport: Send + Sync {
    fn dispatch(&self, request: Arc<Request>) -> BoxFuture<'_, Result<Response, TransportError>>;
}

/// A shared, reusable client session for the alternate transport.
pub trait ClientSession: Send + Sync + 'static {
    /// Perform the request. Blocking; only ever called on a worker thread.
    fn execute(&self, request: &Request) -> Result<RawResponse, TransportError>;

    /// Called at most once, on a worker thread, after in-flight calls have
    /// drained or the drain deadline passed.
    ///
    /// Resources owned by the session are freed when the last `Arc` handle
    /// drops; the manager drops its own handle on that same worker thread
    /// right after this returns. Stragglers still holding a handle keep the
    /// session alive until they finish.
    fn close(&self) {}
}

/// Opens the client session when the engine starts.
pub trait SessionFactory: Send + Sync + 'static {
    /// Blocking; called on a worker thread.
    fn open(&self) -> Result<Arc<dyn ClientSession>, TransportError>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> Result<Arc<dyn ClientSession>, TransportError> + Send + Sync + 'static,
{
    fn open(&self) -> Result<Arc<dyn ClientSession>, TransportError> {
        self()
    }
}

/// Wire headers for `request`: its own headers plus the merged `Cookie`
/// header built from its cookie map.
pub(crate) fn outbound_headers(request: &Request) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(request.headers().len() + 1);
    for (name, value) in request.headers().iter() {
        if name.eq_ignore_ascii_case(COOKIE.as_str()) {
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
        map.append(name, value);
    }
    if let Some(cookie) = request.cookie_header() {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| TransportError::InvalidRequest(format!("cookie header: {}", e)))?;
        map.insert(COOKIE, value);
    }
    Ok(map)
}

/// Merge stored session cookies with a request's own `Cookie` header.
///
/// Stored pairs come first; a request cookie replaces a stored one with the
/// same name.
pub(crate) fn merge_cookies(stored: Option<&str>, own: &str) -> String {
    let own_names: Vec<&str> = cookie_pairs(own).map(|(name, _)| name).collect();
    let mut merged: Vec<&str> = stored
        .into_iter()
        .flat_map(cookie_pairs)
        .filter(|(name, _)| !own_names.contains(name))
        .map(|(_, pair)| pair)
        .collect();
    merged.extend(cookie_pairs(own).map(|(_, pair)| pair));
    merged.join("; ")
}

/// `(name, "name=value")` for each pair of a `Cookie` header value.
fn cookie_pairs<'a>(header: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| (pair.split('=').next().unwrap_or(pair).trim(), pair))
}

/// Redirect policy for a configured limit; zero disables redirects.
pub(crate) fn redirect_policy(max_redirects: usize) -> redirect::Policy {
    if max_redirects == 0 {
        redirect::Policy::none()
    } else {
        redirect::Policy::limited(max_redirects)
    }
}
