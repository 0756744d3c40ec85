//! Built-in async transport over `reqwest::Client`.
//!
//! # Responsibilities
//! - Send requests on the async runtime with connection pooling
//! - Produce canonical responses directly (no normalization pass)
//!
//! # Design Decisions
//! - Same response-type policy as the alternate route, so both routes pick
//!   the same `ResponseKind` for the same bytes
//! - No provenance flag: an unflagged response came from this transport

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::config::DefaultTransportConfig;
use crate::http::{Headers, Request, Response};
use crate::normalize::{ResponseTypePolicy, ResponseTypes};
use crate::transport::{outbound_headers, redirect_policy, DefaultTransport, TransportError};

/// Default transport backed by a pooled async `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    policy: Arc<dyn ResponseTypePolicy>,
}

impl ReqwestTransport {
    pub fn new(config: &DefaultTransportConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(redirect_policy(config.max_redirects));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        Ok(Self {
            client: builder.build()?,
            policy: Arc::new(ResponseTypes),
        })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            policy: Arc::new(ResponseTypes),
        }
    }

    async fn send(&self, request: Arc<Request>) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(outbound_headers(&request)?);
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = Headers::from_raw(
            response
                .headers()
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_bytes())),
        )
        .map_err(|e| TransportError::Http(e.to_string()))?;
        let body = response.bytes().await?;

        let kind = self.policy.resolve(&headers, &url, &body);
        Ok(Response::new(url, status, headers, body, kind, request))
    }
}

impl DefaultTransport for ReqwestTransport {
    fn dispatch(&self, request: Arc<Request>) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(self.send(request))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}
