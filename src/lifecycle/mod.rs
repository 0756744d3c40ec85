//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Engine start (signals.rs):
//!     EngineEvent::Started → SessionManager::start → factory opens session
//!
//! Request (session.rs, inflight.rs):
//!     checkout → lease (session + in-flight guard) → worker thread → drop
//!
//! Engine stop / handler close (session.rs):
//!     mark Closed → drain in-flight (bounded) → release session
//! ```
//!
//! # Design Decisions
//! - Explicit start/stop on an owned manager; no global session handle
//! - Configuration errors (early use, double start) fail loudly
//! - Shutdown has a deadline: stragglers keep their own handle

pub mod inflight;
pub mod session;
pub mod signals;

pub use inflight::{InFlightGuard, InFlightTracker};
pub use session::{SessionLease, SessionManager, SessionStatus};
pub use signals::{EngineEvent, EngineSignals};
