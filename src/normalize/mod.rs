//! Response normalization for the alternate transport.
//!
//! # Data Flow
//! ```text
//! RawResponse (status u16, raw header bytes, body, effective URL)
//!     → status validated
//!     → headers decoded to text (headers.rs)
//!     → effective URL parsed
//!     → ResponseTypePolicy picks the ResponseKind (types.rs)
//!     → Response + provenance flag + Arc<Request>
//! ```
//!
//! # Design Decisions
//! - Only alternate-route responses pass through here
//! - No heuristic recovery: malformed data is an error for the caller
//! - Body bytes are moved, never copied

pub mod types;

use std::sync::Arc;

use reqwest::StatusCode;
use url::Url;

use crate::error::NormalizeError;
use crate::http::{Headers, Request, Response};
use crate::transport::RawResponse;

pub use types::{ResponseTypePolicy, ResponseTypes};

/// Provenance flag attached to responses from the alternate transport.
pub const ALT_TRANSPORT_FLAG: &str = "alt-transport";

/// Maps raw session responses into canonical [`Response`]s.
#[derive(Clone)]
pub struct ResponseNormalizer {
    policy: Arc<dyn ResponseTypePolicy>,
    flag: String,
}

impl ResponseNormalizer {
    pub fn new(policy: Arc<dyn ResponseTypePolicy>, flag: impl Into<String>) -> Self {
        Self {
            policy,
            flag: flag.into(),
        }
    }

    /// The provenance flag this normalizer attaches.
    pub fn flag(&self) -> &str {
        &self.flag
    }

    pub fn normalize(
        &self,
        raw: RawResponse,
        request: Arc<Request>,
    ) -> Result<Response, NormalizeError> {
        let status = StatusCode::from_u16(raw.status)
            .map_err(|_| NormalizeError::InvalidStatus(raw.status))?;
        let headers = Headers::from_raw(raw.headers)?;
        let url = Url::parse(&raw.url).map_err(|source| NormalizeError::InvalidUrl {
            url: raw.url.clone(),
            source,
        })?;
        let kind = self.policy.resolve(&headers, &url, &raw.body);

        Ok(Response::new(url, status, headers, raw.body, kind, request).with_flag(&self.flag))
    }
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(ResponseTypes), ALT_TRANSPORT_FLAG)
    }
}

impl std::fmt::Debug for ResponseNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseNormalizer")
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}
