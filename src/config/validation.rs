//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (pool sizes, timeouts > 0)
//! - Check the bind address and store URL are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.store.url) {
        Ok(url) if matches!(url.scheme(), "redis" | "rediss") => {}
        Ok(url) => errors.push(ValidationError::new(
            "store.url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("store.url", e.to_string())),
    }

    if config.store.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("store.connect_timeout_ms", "must be greater than 0"));
    }
    if config.store.command_timeout_ms == 0 {
        errors.push(ValidationError::new("store.command_timeout_ms", "must be greater than 0"));
    }

    let pool = &config.pool;
    if pool.max_total_connections == 0 {
        errors.push(ValidationError::new("pool.max_total_connections", "must be at least 1"));
    }
    if pool.max_idle_connections > pool.max_total_connections {
        errors.push(ValidationError::new(
            "pool.max_idle_connections",
            format!(
                "{} exceeds max_total_connections ({})",
                pool.max_idle_connections, pool.max_total_connections
            ),
        ));
    }
    if pool.idle_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.idle_timeout_ms", "must be greater than 0"));
    }
    if pool.reap_interval_ms == 0 {
        errors.push(ValidationError::new("pool.reap_interval_ms", "must be greater than 0"));
    }
    if pool.probe_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.probe_timeout_ms", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
