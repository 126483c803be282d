//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by endpoint and outcome
//! - `proxy_request_duration_seconds` (histogram): handler latency by endpoint
//! - `proxy_store_commands_total` (counter): store commands by command and outcome
//! - `proxy_store_command_duration_seconds` (histogram): round-trip latency
//! - `proxy_pool_connections` (gauge): idle and live pooled connections
//! - `proxy_pool_connects_total` (counter): connection attempts by outcome
//! - `proxy_pool_discards_total` (counter): closed connections by reason

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Record a finished `/get` or `/set` request.
pub fn record_request(endpoint: &'static str, outcome: &'static str, start: Instant) {
    counter!("proxy_requests_total", "endpoint" => endpoint, "outcome" => outcome).increment(1);
    histogram!("proxy_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// Record one store round-trip.
pub fn record_command(command: &'static str, outcome: &'static str, start: Instant) {
    counter!("proxy_store_commands_total", "command" => command, "outcome" => outcome).increment(1);
    histogram!("proxy_store_command_duration_seconds", "command" => command)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_pool_connect(success: bool) {
    let outcome = if success { "ok" } else { "error" };
    counter!("proxy_pool_connects_total", "outcome" => outcome).increment(1);
}

pub fn record_pool_discard(reason: &'static str, count: usize) {
    counter!("proxy_pool_discards_total", "reason" => reason).increment(count as u64);
}

pub fn record_pool_state(idle: usize, live: usize) {
    gauge!("proxy_pool_connections", "state" => "idle").set(idle as f64);
    gauge!("proxy_pool_connections", "state" => "live").set(live as f64);
}
