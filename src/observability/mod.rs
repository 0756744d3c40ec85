//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / bridge / session manager produce:
//!     → logging.rs (structured tracing events, request_id + route fields)
//!     → metrics.rs (counters, gauge, histogram)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every dispatch event carries the request ID for correlation
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
