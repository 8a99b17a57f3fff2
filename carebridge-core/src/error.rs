//! The error type every API call resolves to on failure.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status carried by errors raised before any HTTP status was received.
pub const STATUS_UNREACHABLE: u16 = 0;

/// Message carried by every 401 that is not recovered by a refresh.
pub const SESSION_INVALID_MESSAGE: &str = "Session expired or invalid. Please log in again.";

/// Field-level validation errors returned by the server.
///
/// The API sends either a flat list of messages or a map from field name to
/// the messages for that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldErrors {
    /// `["name is required", ...]`
    List(Vec<String>),
    /// `{"name": ["is required"], ...}`
    Fields(BTreeMap<String, Vec<String>>),
}

impl FieldErrors {
    /// Messages for a single field. Always empty for the list form.
    pub fn for_field(&self, field: &str) -> &[String] {
        match self {
            Self::List(_) => &[],
            Self::Fields(map) => map.get(field).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Every message, flattened, with field names prefixed for the map form.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::List(list) => list.clone(),
            Self::Fields(map) => map
                .iter()
                .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{}: {}", field, m)))
                .collect(),
        }
    }

    /// Whether there are no messages at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(list) => list.is_empty(),
            Self::Fields(map) => map.values().all(Vec::is_empty),
        }
    }
}

/// Broad classification of an [`ApiError`], derived from its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 401: missing or expired session. Expected, never reported.
    Unauthorized,
    /// 429: carries retry-after guidance.
    RateLimited,
    /// Other 4xx.
    Client,
    /// 5xx.
    Server,
    /// Status 0: no response was received.
    Unreachable,
    /// A request body could not be encoded, or a success body could not be
    /// decoded into the caller's type.
    Serialization,
}

/// A failed API call.
///
/// This is the only error type the client returns. It always carries a
/// status (0 when no response arrived) and a human-readable message, plus
/// the server's field errors and retry-after hint when available.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} (status {status})")]
pub struct ApiError {
    /// Human-readable description.
    pub message: String,

    /// HTTP status, or [`STATUS_UNREACHABLE`] for transport failures.
    pub status: u16,

    /// Structured validation errors from the response body.
    pub errors: Option<FieldErrors>,

    /// How long the server asked the caller to wait (429 only).
    pub retry_after: Option<Duration>,

    serde_failure: bool,
}

impl ApiError {
    /// Create an error for an HTTP status.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            errors: None,
            retry_after: None,
            serde_failure: false,
        }
    }

    /// 401 that could not be recovered.
    pub fn unauthorized() -> Self {
        Self::new(401, SESSION_INVALID_MESSAGE)
    }

    /// Transport failure before any status was received.
    pub fn unreachable(base_url: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(
            STATUS_UNREACHABLE,
            format!(
                "Unable to connect to the backend at {}. Make sure the API server is \
                 running and reachable, and check the configured API URL. ({})",
                base_url, detail
            ),
        )
    }

    /// A success response whose payload did not match the expected shape.
    pub fn decode(status: u16, detail: impl std::fmt::Display) -> Self {
        let mut err = Self::new(status, format!("Failed to decode response: {}", detail));
        err.serde_failure = true;
        err
    }

    /// A request body that could not be serialized. Nothing was sent.
    pub fn encode(detail: impl std::fmt::Display) -> Self {
        let mut err = Self::new(
            STATUS_UNREACHABLE,
            format!("Failed to encode request body: {}", detail),
        );
        err.serde_failure = true;
        err
    }

    /// Generic message used when the error body carries none.
    pub fn fallback_message(status: u16) -> String {
        format!("HTTP error! status: {}", status)
    }

    /// Attach field-level errors.
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = Some(errors);
        self
    }

    /// Attach a retry-after hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        if self.serde_failure {
            return ErrorKind::Serialization;
        }
        match self.status {
            STATUS_UNREACHABLE => ErrorKind::Unreachable,
            401 => ErrorKind::Unauthorized,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    /// Whether this is the expected "not logged in" condition.
    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    /// Whether the backend could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        self.kind() == ErrorKind::Unreachable
    }

    /// Retry-after hint in whole seconds, if any.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| d.as_secs())
    }

    /// Field-level errors, if any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        self.errors.as_ref()
    }

    /// Whether this failure is worth forwarding to an error reporter.
    ///
    /// Unauthorized, rate-limited and unreachable outcomes are expected
    /// states rather than application errors.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Client | ErrorKind::Server | ErrorKind::Serialization
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ApiError::new(0, "x").kind(), ErrorKind::Unreachable);
        assert_eq!(ApiError::new(401, "x").kind(), ErrorKind::Unauthorized);
        assert_eq!(ApiError::new(429, "x").kind(), ErrorKind::RateLimited);
        assert_eq!(ApiError::new(404, "x").kind(), ErrorKind::Client);
        assert_eq!(ApiError::new(422, "x").kind(), ErrorKind::Client);
        assert_eq!(ApiError::new(503, "x").kind(), ErrorKind::Server);
        assert_eq!(ApiError::decode(200, "bad").kind(), ErrorKind::Serialization);
        assert_eq!(ApiError::encode("bad").kind(), ErrorKind::Serialization);
        assert!(!ApiError::encode("bad").is_unreachable());
    }

    #[test]
    fn test_unauthorized_is_not_reportable() {
        let err = ApiError::unauthorized();
        assert_eq!(err.status, 401);
        assert_eq!(err.message, SESSION_INVALID_MESSAGE);
        assert!(!err.is_reportable());
        assert!(ApiError::new(500, "boom").is_reportable());
    }

    #[test]
    fn test_unreachable_message_guides_operator() {
        let err = ApiError::unreachable("http://localhost:3000/api", "connection refused");
        assert_eq!(err.status, STATUS_UNREACHABLE);
        assert!(err.is_unreachable());
        assert!(err.message.contains("http://localhost:3000/api"));
        assert!(err.message.contains("running"));
    }

    #[test]
    fn test_display_includes_status() {
        let err = ApiError::new(404, "Patient not found");
        assert_eq!(err.to_string(), "Patient not found (status 404)");
    }

    #[test]
    fn test_field_errors_both_shapes() {
        let list: FieldErrors = serde_json::from_value(serde_json::json!(["bad name"])).unwrap();
        assert_eq!(list, FieldErrors::List(vec!["bad name".to_string()]));
        assert!(list.for_field("name").is_empty());

        let map: FieldErrors =
            serde_json::from_value(serde_json::json!({"name": ["is required"]})).unwrap();
        assert_eq!(map.for_field("name"), ["is required".to_string()]);
        assert_eq!(map.messages(), vec!["name: is required".to_string()]);
        assert!(!map.is_empty());
    }

    #[test]
    fn test_retry_after_secs() {
        let err = ApiError::new(429, "slow down").with_retry_after(Duration::from_secs(30));
        assert_eq!(err.retry_after_secs(), Some(30));
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
}
