//! Response type resolution.
//!
//! Picks the [`ResponseKind`] for a body the same way for every transport:
//!
//! ```text
//! Content-Type header        (html / xml / json / text / other)
//!     → Content-Disposition filename extension
//!     → URL path extension
//!     → body sniffing (binary check, then markup markers)
//! ```
//!
//! A step that only yields a generic binary type falls through to the next.

use content_inspector::{inspect, ContentType};
use mime::Mime;
use url::Url;

use crate::http::{Headers, ResponseKind};

/// Bytes of body inspected when sniffing.
const SNIFF_LEN: usize = 5000;

/// Policy mapping response metadata to a concrete response kind.
pub trait ResponseTypePolicy: Send + Sync {
    fn resolve(&self, headers: &Headers, url: &Url, body: &[u8]) -> ResponseKind;
}

/// Default policy: content type, then filenames, then body sniffing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTypes;

impl ResponseTypePolicy for ResponseTypes {
    fn resolve(&self, headers: &Headers, url: &Url, body: &[u8]) -> ResponseKind {
        let from_content_type = headers
            .get("content-type")
            .and_then(|ct| ct.parse::<Mime>().ok())
            .and_then(|m| kind_for_mime(&m));
        if let Some(kind) = from_content_type {
            return kind;
        }

        let from_disposition = headers
            .get("content-disposition")
            .and_then(disposition_filename)
            .and_then(|name| kind_for_filename(&name));
        if let Some(kind) = from_disposition {
            return kind;
        }

        if let Some(kind) = kind_for_filename(url.path()) {
            return kind;
        }

        kind_for_body(body)
    }
}

/// `None` means the type says nothing useful (generic binary).
fn kind_for_mime(m: &Mime) -> Option<ResponseKind> {
    let top = m.type_().as_str().to_ascii_lowercase();
    let sub = m.subtype().as_str().to_ascii_lowercase();
    let suffix = m.suffix().map(|s| s.as_str().to_ascii_lowercase());

    match (top.as_str(), sub.as_str(), suffix.as_deref()) {
        ("text", "html", _) | ("application", "xhtml", Some("xml")) => Some(ResponseKind::Html),
        ("text", "xml", _) | ("application", "xml", _) | (_, _, Some("xml")) => {
            Some(ResponseKind::Xml)
        }
        ("text", "json", _) | ("application", "json", _) | ("application", "x-json", _) => {
            Some(ResponseKind::Json)
        }
        (_, _, Some("json")) => Some(ResponseKind::Json),
        ("text", _, _) => Some(ResponseKind::Text),
        ("application", "javascript", _)
        | ("application", "x-javascript", _)
        | ("application", "ecmascript", _) => Some(ResponseKind::Text),
        _ => None,
    }
}

fn kind_for_filename(path: &str) -> Option<ResponseKind> {
    let guess = mime_guess::from_path(path).first()?;
    kind_for_mime(&guess)
}

fn kind_for_body(body: &[u8]) -> ResponseKind {
    let chunk = &body[..body.len().min(SNIFF_LEN)];
    if chunk.is_empty() {
        return ResponseKind::Text;
    }
    if matches!(inspect(chunk), ContentType::BINARY) {
        return ResponseKind::Binary;
    }

    let lower = String::from_utf8_lossy(chunk).to_ascii_lowercase();
    if lower.contains("<html") || lower.contains("<!doctype html") {
        ResponseKind::Html
    } else if lower.trim_start().starts_with("<?xml") {
        ResponseKind::Xml
    } else {
        ResponseKind::Text
    }
}

/// `filename` parameter of a `Content-Disposition` value.
fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (key, val) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("filename") {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}
