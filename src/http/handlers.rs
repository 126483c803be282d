//! Endpoint handlers.
//!
//! `/get` and `/set` turn query parameters into one store command and answer
//! with an [`Envelope`]. `/about`, `/uptime` and `/` are informational.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::command::CommandExecutor;
use crate::config::schema::{InfoConfig, MalformedValuePolicy};
use crate::http::codec;
use crate::http::request::first_param;
use crate::http::response::{Envelope, MALFORMED_VALUE, MISSING_KEY, MISSING_KEY_AND_VALUE};
use crate::observability::metrics;
use crate::store::Connector;

/// Application state injected into handlers.
pub struct AppState<C: Connector> {
    pub executor: CommandExecutor<C>,
    pub info: Arc<InfoConfig>,
    pub malformed_value: MalformedValuePolicy,
    pub started_at: Instant,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            info: Arc::clone(&self.info),
            malformed_value: self.malformed_value,
            started_at: self.started_at,
        }
    }
}

type Params = Query<Vec<(String, String)>>;

/// `GET /get?key=K`
pub async fn get_value<C: Connector>(
    State(state): State<AppState<C>>,
    Query(params): Params,
) -> Envelope {
    let start = Instant::now();

    let Some(key) = first_param(&params, "key") else {
        metrics::record_request("get", "missing_params", start);
        return Envelope::failed(MISSING_KEY);
    };

    let envelope = match state.executor.get(key).await {
        Ok(Some(value)) => Envelope::ok(codec::encode(&value)),
        // Miss and backend failure share the wire status; the executor has
        // already logged the failure case.
        Ok(None) | Err(_) => Envelope::failed(""),
    };

    metrics::record_request("get", outcome_label(&envelope), start);
    envelope
}

/// `GET /set?key=K&value=BASE64`
pub async fn set_value<C: Connector>(
    State(state): State<AppState<C>>,
    Query(params): Params,
) -> Envelope {
    let start = Instant::now();

    let (Some(key), Some(encoded)) = (first_param(&params, "key"), first_param(&params, "value"))
    else {
        metrics::record_request("set", "missing_params", start);
        return Envelope::failed(MISSING_KEY_AND_VALUE);
    };

    let value = match state.malformed_value {
        MalformedValuePolicy::Forward => {
            let (bytes, err) = codec::decode_lenient(encoded);
            if let Some(e) = err {
                tracing::warn!(
                    key = %key,
                    error = %e,
                    forwarded_bytes = bytes.len(),
                    "Base64 decode error, writing partial value"
                );
            }
            bytes
        }
        MalformedValuePolicy::Reject => match codec::decode(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Base64 decode error, rejecting write");
                metrics::record_request("set", "malformed_value", start);
                return Envelope::failed(MALFORMED_VALUE);
            }
        },
    };

    let envelope = match state.executor.set(key, &value).await {
        Ok(()) => Envelope::ok(""),
        Err(_) => Envelope::failed(""),
    };

    metrics::record_request("set", outcome_label(&envelope), start);
    envelope
}

/// `GET /about`
pub async fn about<C: Connector>(State(state): State<AppState<C>>) -> String {
    state.info.about_text.clone()
}

/// `GET /uptime`
pub async fn uptime<C: Connector>(State(state): State<AppState<C>>) -> String {
    let elapsed = state.started_at.elapsed();
    tracing::info!(uptime = ?elapsed, "Uptime requested");
    format!("Uptime:\t{}\n", format_duration(elapsed))
}

/// `GET /` and every unknown path.
pub async fn redirect_root<C: Connector>(State(state): State<AppState<C>>) -> Response {
    (
        StatusCode::MOVED_PERMANENTLY,
        [(header::LOCATION, state.info.redirect_url.clone())],
    )
        .into_response()
}

fn outcome_label(envelope: &Envelope) -> &'static str {
    if envelope.is_ok() {
        "ok"
    } else {
        "failed"
    }
}

/// Render a duration as `1h2m3.5s`, or in ms/µs/ns below one second.
fn format_duration(d: Duration) -> String {
    if d.is_zero() {
        return "0s".to_string();
    }

    let nanos = d.subsec_nanos();
    if d.as_secs() == 0 {
        return if nanos < 1_000 {
            format!("{}ns", nanos)
        } else if nanos < 1_000_000 {
            format!("{}µs", with_fraction(u64::from(nanos / 1_000), nanos % 1_000, 3))
        } else {
            format!("{}ms", with_fraction(u64::from(nanos / 1_000_000), nanos % 1_000_000, 6))
        };
    }

    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&with_fraction(seconds, nanos, 9));
    out.push('s');
    out
}

/// `whole.frac` with `frac` zero-padded to `digits` and trailing zeros dropped.
fn with_fraction(whole: u64, frac: u32, digits: usize) -> String {
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
