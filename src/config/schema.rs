//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backing store address and command deadlines.
    pub store: StoreConfig,

    /// Connection pool sizing and health policy.
    pub pool: PoolConfig,

    /// HTTP timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Handling of the base64 `value` parameter.
    pub codec: CodecConfig,

    /// Informational endpoints.
    pub info: InfoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backing store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store URL, e.g. "redis://:password@host:6379/0".
    pub url: String,

    /// Timeout for opening a store connection in milliseconds.
    pub connect_timeout_ms: u64,

    /// Timeout for a single store command in milliseconds.
    pub command_timeout_ms: u64,
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout_ms: 5_000,
            command_timeout_ms: 5_000,
        }
    }
}

/// Liveness policy applied to connections returned to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckPolicy {
    /// Probe only links quiet for longer than the freshness window.
    FreshnessWindow,
    /// Probe every returned link.
    AlwaysProbe,
    /// Never probe.
    NeverProbe,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Hard cap on open store connections, checked out or idle.
    pub max_total_connections: usize,

    /// Cap on connections kept warm while unused.
    pub max_idle_connections: usize,

    /// Idle connections older than this are closed (milliseconds).
    pub idle_timeout_ms: u64,

    /// Connections verified within this window skip the liveness probe (seconds).
    pub health_check_freshness_secs: u64,

    /// Liveness probe deadline in milliseconds.
    pub probe_timeout_ms: u64,

    /// How often the background sweep evicts expired idle connections (milliseconds).
    pub reap_interval_ms: u64,

    pub health_check: HealthCheckPolicy,
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn health_check_freshness(&self) -> Duration {
        Duration::from_secs(self.health_check_freshness_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total_connections: 10,
            max_idle_connections: 2,
            idle_timeout_ms: 10_000,
            health_check_freshness_secs: 60,
            probe_timeout_ms: 2_000,
            reap_interval_ms: 1_000,
            health_check: HealthCheckPolicy::FreshnessWindow,
        }
    }
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// What to do with a `value` parameter that is not valid base64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedValuePolicy {
    /// Log the error and write whatever prefix decoded cleanly.
    Forward,
    /// Answer with a failure envelope without touching the store.
    Reject,
}

/// Transport codec configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    pub malformed_value: MalformedValuePolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            malformed_value: MalformedValuePolicy::Forward,
        }
    }
}

/// Static informational endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InfoConfig {
    /// Body of `GET /about`.
    pub about_text: String,

    /// Target of the `GET /` redirect.
    pub redirect_url: String,
}

impl Default for InfoConfig {
    fn default() -> Self {
        Self {
            about_text: format!("redis-http-proxy v{}\n", env!("CARGO_PKG_VERSION")),
            redirect_url: "https://github.com/ansonl/".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ProxyConfig::default();
        assert_eq!(config.pool.max_total_connections, 10);
        assert_eq!(config.pool.max_idle_connections, 2);
        assert_eq!(config.pool.idle_timeout(), Duration::from_secs(10));
        assert_eq!(config.pool.health_check_freshness(), Duration::from_secs(60));
        assert_eq!(config.pool.health_check, HealthCheckPolicy::FreshnessWindow);
        assert_eq!(config.codec.malformed_value, MalformedValuePolicy::Forward);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [pool]
            max_total_connections = 4
            health_check = "always_probe"

            [codec]
            malformed_value = "reject"
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.max_total_connections, 4);
        assert_eq!(config.pool.max_idle_connections, 2);
        assert_eq!(config.pool.health_check, HealthCheckPolicy::AlwaysProbe);
        assert_eq!(config.codec.malformed_value, MalformedValuePolicy::Reject);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
