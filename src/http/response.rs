//! Response envelope for the GET/SET endpoints.
//!
//! Every data endpoint answers `{"status": "...", "data": "..."}` with both
//! fields as strings: status `"0"` on success, `"-1"` on any failure. A
//! missing key and a backend failure look the same on the wire.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "0";
pub const STATUS_FAILED: &str = "-1";

pub const MISSING_KEY: &str = "Missing key parameter.";
pub const MISSING_KEY_AND_VALUE: &str = "Missing key and value parameters.";
pub const MALFORMED_VALUE: &str = "Malformed value parameter.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    pub data: String,
}

impl Envelope {
    pub fn ok(data: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            data: data.into(),
        }
    }

    pub fn failed(data: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            data: data.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
