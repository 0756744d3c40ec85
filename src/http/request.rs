//! Outbound fetch request.
//!
//! # Responsibilities
//! - Validate method and URL once, at construction
//! - Carry headers, cookies, body and opaque metadata to a transport
//! - Decide the route flag once so dispatch never re-reads metadata
//!
//! # Design Decisions
//! - Immutable after `build()`; dispatch shares it behind an `Arc`
//! - The `"tls"` metadata key is honored for engines that still tag requests
//!   that way; any JSON-truthy value selects the alternate transport
//! - All other metadata keys are opaque and passed through untouched

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;
use uuid::Uuid;

use crate::error::RequestError;
use crate::http::headers::Headers;

/// Metadata key that routes a request to the alternate transport.
pub const ROUTING_META_KEY: &str = "tls";

/// Unique identifier attached to every request for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fetch request as handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    method: Method,
    url: Url,
    headers: Headers,
    cookies: BTreeMap<String, String>,
    body: Option<Bytes>,
    meta: Map<String, Value>,
    alternate_transport: bool,
}

impl Request {
    /// Start building a request.
    pub fn builder(method: impl AsRef<str>, url: impl AsRef<str>) -> RequestBuilder {
        RequestBuilder::new(method.as_ref(), url.as_ref())
    }

    /// Shorthand for a plain GET with no extras.
    pub fn get(url: impl AsRef<str>) -> Result<Self, RequestError> {
        Self::builder("GET", url).build()
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    /// Whether this request goes through the session-based transport.
    pub fn alternate_transport(&self) -> bool {
        self.alternate_transport
    }

    /// The `Cookie` header value this request should send: any explicit
    /// `Cookie` header followed by the request's cookie map.
    pub fn cookie_header(&self) -> Option<String> {
        let mut parts: Vec<String> = self
            .headers
            .get_all("cookie")
            .map(str::to_string)
            .collect();
        parts.extend(self.cookies.iter().map(|(k, v)| format!("{}={}", k, v)));
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Builder for [`Request`]. Validation happens in [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder {
    method: String,
    url: String,
    headers: Headers,
    cookies: BTreeMap<String, String>,
    body: Option<Bytes>,
    meta: Map<String, Value>,
    alternate_transport: bool,
}

impl RequestBuilder {
    fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers: Headers::new(),
            cookies: BTreeMap::new(),
            body: None,
            meta: Map::new(),
            alternate_transport: false,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        for (name, value) in headers.iter() {
            self.headers.append(name, value);
        }
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Route through the session-based transport regardless of metadata.
    pub fn alternate_transport(mut self, enabled: bool) -> Self {
        self.alternate_transport = enabled;
        self
    }

    pub fn build(self) -> Result<Request, RequestError> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| RequestError::InvalidMethod(self.method.clone()))?;

        let url = Url::parse(&self.url).map_err(|source| RequestError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(RequestError::UnsupportedScheme(other.to_string())),
        }

        let flagged = self.meta.get(ROUTING_META_KEY).map(is_truthy).unwrap_or(false);

        Ok(Request {
            id: RequestId::new(),
            method,
            url,
            headers: self.headers,
            cookies: self.cookies,
            body: self.body,
            meta: self.meta,
            alternate_transport: self.alternate_transport || flagged,
        })
    }
}

/// JSON truthiness: false, null, 0, "", [] and {} are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
