//! Response observed by a virtual user, with its timings.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP status code. `0` means no response was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const NONE: StatusCode = StatusCode(0);
    pub const OK: StatusCode = StatusCode(200);
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);
    pub const SERVICE_UNAVAILABLE: StatusCode = StatusCode(503);

    /// Check if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Check if the status code indicates a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.0)
    }

    /// Check if the status code indicates a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.0)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::NONE
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> Self {
        code.0
    }
}

impl PartialEq<u16> for StatusCode {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request timings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timings {
    /// Time from sending the request to receiving the last body byte.
    pub duration: Duration,
}

impl Timings {
    /// Duration in fractional milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_nanos() as f64 / 1_000_000.0
    }
}

/// Response handed to checks.
///
/// Transport failures do not surface as `Err`; they produce a response with
/// [`StatusCode::NONE`] and `error` set, so status predicates simply fail.
#[derive(Debug, Clone, Default)]
pub struct LoadResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// HTTP headers keyed by lowercase name.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Option<Bytes>,
    /// Measured timings.
    pub timings: Timings,
    /// Transport error, if the request did not complete.
    pub error: Option<String>,
}

impl LoadResponse {
    /// Create a response with the given status and duration.
    pub fn new(status: impl Into<StatusCode>, duration: Duration) -> Self {
        Self {
            status: status.into(),
            timings: Timings { duration },
            ..Default::default()
        }
    }

    /// Create a response for a request that never completed.
    pub fn transport_error(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            error: Some(error.into()),
            timings: Timings { duration },
            ..Default::default()
        }
    }

    /// Whether the request counts as failed (no response, or 4xx/5xx).
    pub fn failed(&self) -> bool {
        self.status == StatusCode::NONE || self.status.0 >= 400
    }

    /// Get a header value by case-insensitive name.
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_ascii_lowercase())
    }

    /// Get the body as text if present.
    pub fn text_body(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).to_string())
    }

    /// Parse the body as JSON if present.
    pub fn json_body<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<T, serde_json::Error>> {
        self.body.as_ref().map(|b| serde_json::from_slice(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_classification() {
        let ok = LoadResponse::new(200, Duration::from_millis(5));
        assert!(!ok.failed());

        let bad = LoadResponse::new(StatusCode::BAD_REQUEST, Duration::from_millis(5));
        assert!(bad.failed());

        let dropped = LoadResponse::transport_error("connection refused", Duration::ZERO);
        assert_eq!(dropped.status, StatusCode::NONE);
        assert!(dropped.failed());
        assert_eq!(dropped.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_status_code_helpers() {
        assert!(StatusCode::OK.is_success());
        assert!(!StatusCode::NONE.is_success());
        assert!(StatusCode::NOT_FOUND.is_client_error());
        assert!(StatusCode::SERVICE_UNAVAILABLE.is_server_error());
        assert_eq!(StatusCode::OK, 200);
    }

    #[test]
    fn test_duration_ms() {
        let timings = Timings {
            duration: Duration::from_micros(1500),
        };
        assert!((timings.duration_ms() - 1.5).abs() < f64::EPSILON);
    }
}
