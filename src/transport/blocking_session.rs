//! Session-based transport over `reqwest::blocking::Client`.
//!
//! # Responsibilities
//! - Open one shared client session (connection pool + cookie jar)
//! - Execute requests synchronously and hand back raw responses
//!
//! # Design Decisions
//! - No default headers: only the request's own headers go on the wire
//! - Cookies from the session jar go out with every request; a request's
//!   own cookies are merged in and win on a name clash
//! - Every method here blocks; callers run them on the blocking pool
//! - The blocking client is internally synchronized, so one session
//!   serves all concurrent callers

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};

use crate::config::SessionConfig;
use crate::http::Request;
use crate::transport::{
    merge_cookies, outbound_headers, redirect_policy, ClientSession, RawResponse, SessionFactory,
    TransportError,
};

/// Shared blocking client session.
#[derive(Debug)]
pub struct BlockingSession {
    client: reqwest::blocking::Client,
    /// `None` when the cookie store is disabled.
    jar: Option<Arc<Jar>>,
}

impl BlockingSession {
    /// Request headers with the jar's cookies for the request URL merged
    /// into any cookies the request carries.
    ///
    /// Without request cookies the header is left to the client, which
    /// reads the jar itself.
    fn wire_headers(&self, request: &Request) -> Result<HeaderMap, TransportError> {
        let mut headers = outbound_headers(request)?;
        if let (Some(jar), Some(own)) = (&self.jar, request.cookie_header()) {
            let stored = jar.cookies(request.url());
            let stored = stored.as_ref().and_then(|v| v.to_str().ok());
            let merged = merge_cookies(stored, &own);
            let value = HeaderValue::from_str(&merged)
                .map_err(|e| TransportError::InvalidRequest(format!("cookie header: {}", e)))?;
            headers.insert(COOKIE, value);
        }
        Ok(headers)
    }
}

impl ClientSession for BlockingSession {
    fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(self.wire_headers(request)?);
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();
        let body = response.bytes()?;

        Ok(RawResponse {
            status,
            headers,
            body,
            url,
        })
    }

    /// Logs the release. The client's connection pool and background
    /// runtime are torn down when the last handle to this session drops,
    /// which the lifecycle manager arranges to happen on a worker thread.
    fn close(&self) {
        tracing::debug!("Releasing blocking client session");
    }
}

/// Opens [`BlockingSession`]s from configuration.
#[derive(Debug, Clone)]
pub struct BlockingSessionFactory {
    config: SessionConfig,
}

impl BlockingSessionFactory {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for BlockingSessionFactory {
    fn open(&self) -> Result<Arc<dyn ClientSession>, TransportError> {
        let jar = self.config.cookie_store.then(|| Arc::new(Jar::default()));
        let mut builder = reqwest::blocking::Client::builder()
            .default_headers(HeaderMap::new())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_secs))
            .redirect(redirect_policy(self.config.max_redirects));
        if let Some(user_agent) = &self.config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        if let Some(jar) = &jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        let client = builder.build()?;
        tracing::debug!(
            cookie_store = self.config.cookie_store,
            max_redirects = self.config.max_redirects,
            "Blocking client session opened"
        );
        Ok(Arc::new(BlockingSession { client, jar }))
    }
}
