//! Error types for dispatch, session lifecycle and normalization.

use thiserror::Error;
use url::Url;

use crate::http::request::RequestId;
use crate::transport::{Route, TransportError};

/// Errors raised while building a [`Request`](crate::http::Request).
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Session lifecycle errors. All of these are configuration errors: they
/// are raised immediately and never downgraded to the default transport.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A flagged request arrived before the engine-started notification.
    #[error("alternate transport not initialized: engine has not started")]
    NotStarted,

    /// The engine-started notification fired more than once.
    #[error("alternate transport already initialized")]
    AlreadyStarted,

    /// The session was released; no further requests are accepted.
    #[error("session closed")]
    Closed,

    /// The session backend could not be opened.
    #[error("failed to open client session: {0}")]
    Open(#[source] TransportError),
}

/// Errors mapping a raw backend response into a [`Response`](crate::http::Response).
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid status code {0}")]
    InvalidStatus(u16),

    #[error("malformed header data: {0}")]
    InvalidHeaderName(#[from] crate::http::headers::InvalidHeaderName),

    #[error("invalid effective URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors returned by [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch).
///
/// Both routes fail with the same shapes, so callers can handle failures
/// without knowing which transport ran.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("alternate transport unavailable for request {request_id} ({url}): {source}")]
    Session {
        request_id: RequestId,
        url: Url,
        #[source]
        source: SessionError,
    },

    #[error("{route} transport failed for request {request_id} ({url}): {source}")]
    Transport {
        route: Route,
        request_id: RequestId,
        url: Url,
        #[source]
        source: TransportError,
    },

    #[error("could not normalize response for request {request_id} ({url}): {source}")]
    Normalize {
        request_id: RequestId,
        url: Url,
        #[source]
        source: NormalizeError,
    },
}

impl DispatchError {
    /// The route that produced this error, if a transport ran at all.
    pub fn route(&self) -> Option<Route> {
        match self {
            DispatchError::Session { .. } => Some(Route::Alternate),
            DispatchError::Transport { route, .. } => Some(*route),
            DispatchError::Normalize { .. } => Some(Route::Alternate),
        }
    }

    /// The request that failed.
    pub fn request_id(&self) -> RequestId {
        match self {
            DispatchError::Session { request_id, .. }
            | DispatchError::Transport { request_id, .. }
            | DispatchError::Normalize { request_id, .. } => *request_id,
        }
    }

    /// Whether this is a configuration error (ordering bug in the host).
    pub fn is_configuration(&self) -> bool {
        matches!(self, DispatchError::Session { .. })
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
