//! Dispatch metrics.
//!
//! # Metrics
//! - `fetch_dispatch_requests_total` (counter): requests by route, outcome
//! - `fetch_dispatch_request_duration_seconds` (histogram): latency by route
//! - `fetch_dispatch_inflight_blocking` (gauge): blocking calls running now
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op
//! - The Prometheus exporter is opt-in and installed by the binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::transport::Route;

pub const REQUESTS_TOTAL: &str = "fetch_dispatch_requests_total";
pub const REQUEST_DURATION: &str = "fetch_dispatch_request_duration_seconds";
pub const INFLIGHT_BLOCKING: &str = "fetch_dispatch_inflight_blocking";

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished dispatch.
pub fn record_dispatch(route: Route, outcome: &'static str, started: Instant) {
    counter!(REQUESTS_TOTAL, "route" => route.as_str(), "outcome" => outcome).increment(1);
    histogram!(REQUEST_DURATION, "route" => route.as_str())
        .record(started.elapsed().as_secs_f64());
}

/// Counts a blocking call for as long as it is alive.
#[derive(Debug)]
pub struct BlockingGauge(());

impl BlockingGauge {
    pub fn enter() -> Self {
        gauge!(INFLIGHT_BLOCKING).increment(1.0);
        Self(())
    }
}

impl Drop for BlockingGauge {
    fn drop(&mut self) {
        gauge!(INFLIGHT_BLOCKING).decrement(1.0);
    }
}
