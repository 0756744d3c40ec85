//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::normalize::ALT_TRANSPORT_FLAG;

/// Root configuration for the dispatch layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Session-based (alternate) transport settings.
    pub session: SessionConfig,

    /// Built-in (default) transport settings.
    pub default_transport: DefaultTransportConfig,

    /// Blocking-call bridge settings.
    pub bridge: BridgeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Session-based transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// User-Agent sent by the session. `None` sends no default headers.
    pub user_agent: Option<String>,

    /// Total request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum redirects to follow (0 disables redirects).
    pub max_redirects: usize,

    /// Keep cookies set by responses across requests.
    pub cookie_store: bool,

    /// Flag attached to responses produced by this transport.
    pub provenance_flag: String,

    /// How long shutdown waits for in-flight calls, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            cookie_store: true,
            provenance_flag: ALT_TRANSPORT_FLAG.to_string(),
            drain_timeout_secs: 10,
        }
    }
}

/// Built-in transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultTransportConfig {
    /// User-Agent header for requests that do not set one.
    pub user_agent: Option<String>,

    /// Total request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum redirects to follow (0 disables redirects).
    pub max_redirects: usize,
}

impl Default for DefaultTransportConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
        }
    }
}

/// Blocking-call bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum concurrent blocking calls. Unset defers to the runtime's
    /// blocking thread pool.
    pub max_in_flight: Option<usize>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
