//! Canonical response type.
//!
//! # Responsibilities
//! - One response shape for every transport
//! - Record which transport produced it (provenance flags)
//! - Keep a back-reference to the originating request
//!
//! # Design Decisions
//! - Immutable after construction; flags are attached while building
//! - `ResponseKind` replaces a response class hierarchy: one struct, tagged
//! - The request is shared (`Arc`), never copied

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use reqwest::StatusCode;
use url::Url;

use crate::http::headers::{decode_value, Headers};
use crate::http::request::Request;

/// Concrete representation selected for a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Html,
    Xml,
    Json,
    Text,
    Binary,
}

impl ResponseKind {
    /// Whether the body is meant to be read as text.
    pub fn is_text(&self) -> bool {
        !matches!(self, ResponseKind::Binary)
    }
}

/// The response every transport path returns to the engine.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    kind: ResponseKind,
    flags: Vec<String>,
    request: Arc<Request>,
}

impl Response {
    pub fn new(
        url: Url,
        status: StatusCode,
        headers: Headers,
        body: Bytes,
        kind: ResponseKind,
        request: Arc<Request>,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            body,
            kind,
            flags: Vec::new(),
            request,
        }
    }

    /// Attach a provenance flag. Duplicates are ignored.
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// Effective URL (after redirects).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// The request this response answers.
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Body decoded as text, or `None` for binary responses.
    ///
    /// Honors the `charset` parameter of `Content-Type` for UTF-8 and
    /// Latin-1 family charsets; anything else is decoded as lossy UTF-8.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        if !self.kind.is_text() {
            return None;
        }
        let charset = self
            .headers
            .get("content-type")
            .and_then(|ct| ct.parse::<Mime>().ok())
            .and_then(|m| m.get_param(mime::CHARSET).map(|c| c.as_str().to_ascii_lowercase()));

        match charset.as_deref() {
            Some("iso-8859-1") | Some("latin1") | Some("latin-1") | Some("us-ascii") => {
                Some(Cow::Owned(decode_value(&self.body)))
            }
            _ => Some(String::from_utf8_lossy(&self.body)),
        }
    }
}
