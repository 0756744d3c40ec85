//! Request dispatch between an async transport and a session-based
//! blocking transport.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                   DISPATCHER                     │
//!                     │                                                  │
//!   Request ──────────┼─▶ route (tls flag) ──┬─▶ DefaultTransport ───────┼──▶ Response
//!                     │                      │     (async reqwest)       │
//!                     │                      │                           │
//!                     │                      └─▶ SessionManager          │
//!                     │                            → BlockingBridge      │
//!                     │                            → ClientSession       │
//!                     │                            → ResponseNormalizer ─┼──▶ Response
//!                     │                                                  │     + flag
//!                     │  ┌─────────────────────────────────────────────┐ │
//!                     │  │ config · lifecycle signals · observability  │ │
//!                     │  └─────────────────────────────────────────────┘ │
//!                     └──────────────────────────────────────────────────┘
//! ```

// Core
pub mod dispatcher;
pub mod error;
pub mod http;

// Transports
pub mod bridge;
pub mod normalize;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult, NormalizeError, RequestError, SessionError};
pub use http::{Headers, Request, RequestBuilder, Response, ResponseKind};
pub use lifecycle::{EngineEvent, EngineSignals, SessionManager};
pub use transport::{ClientSession, DefaultTransport, Route, SessionFactory, TransportError};
