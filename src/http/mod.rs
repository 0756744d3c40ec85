//! Request and response model shared by every transport.
//!
//! # Data Flow
//! ```text
//! Engine builds Request (validated, route flag decided)
//!     → dispatcher (routes on request.alternate_transport())
//!     → transport produces Response (or RawResponse → normalize)
//!     → Response (kind, flags, back-reference to Request) → engine
//! ```

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Request, RequestBuilder, RequestId, ROUTING_META_KEY};
pub use response::{Response, ResponseKind};
