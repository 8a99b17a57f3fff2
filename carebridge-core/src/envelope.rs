//! Response envelope normalization.
//!
//! The API returns payloads either wrapped as
//! `{ "data": T, "message"?: string, "errors"?: ... }` or flat as `T`.
//! Normalization is a two-step contract:
//!
//! 1. [`normalize`]: if the body is a JSON object with a `data` key, `data`
//!    is the payload and the sibling `message`/`errors` keys are lifted into
//!    the envelope. Any other body is the payload as a whole.
//! 2. [`RawEnvelope::decode`]: convert the payload into the caller's type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldErrors;

/// The normalized shape of every successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// The payload.
    pub data: T,

    /// Optional informational message from the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Optional field-level messages attached to a successful response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl<T> ApiResponse<T> {
    /// Wrap a payload with no message or errors.
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
            errors: None,
        }
    }

    /// Unwrap the payload.
    pub fn into_data(self) -> T {
        self.data
    }
}

/// An envelope whose payload is still untyped JSON.
pub type RawEnvelope = ApiResponse<Value>;

impl RawEnvelope {
    /// Convert the payload into `T`, keeping `message` and `errors`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, serde_json::Error> {
        Ok(ApiResponse {
            data: serde_json::from_value(self.data)?,
            message: self.message,
            errors: self.errors,
        })
    }
}

/// Normalize a response body into an envelope.
///
/// A `message` that is not a string or an `errors` value of an unexpected
/// shape is dropped rather than failing the call.
pub fn normalize(body: Value) -> RawEnvelope {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            let data = map.remove("data").unwrap_or(Value::Null);
            let message = match map.remove("message") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            };
            let errors = map
                .remove("errors")
                .and_then(|v| serde_json::from_value(v).ok());
            ApiResponse {
                data,
                message,
                errors,
            }
        }
        other => ApiResponse::new(other),
    }
}

/// Parse raw response bytes leniently.
///
/// An empty body becomes `null`; a body that is not JSON is passed through
/// as a JSON string so the caller can still see it.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Extract a string field from a body that may nest it under `data`.
///
/// Used for token responses such as `{"accessToken": "..."}` and
/// `{"data": {"accessToken": "..."}}`.
pub fn find_string_field(body: &Value, field: &str) -> Option<String> {
    let direct = body.get(field).and_then(Value::as_str);
    let nested = || body.get("data")?.get(field)?.as_str();
    direct.or_else(nested).map(str::to_string)
}
