//! `Retry-After` parsing for rate-limited responses.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;

/// Retry-after hint from a 429 response.
///
/// The `Retry-After` header wins over the body. The header may hold
/// delta-seconds or an HTTP-date; the body may carry `retryAfter` (or
/// `retry_after`) as a number of seconds or a numeric string, either at the
/// top level or under `data`.
pub fn from_response(headers: &HeaderMap, body: &Value) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_header_value(v, Utc::now()))
        .or_else(|| from_body(body))
}

/// Parse a `Retry-After` header value relative to `now`.
///
/// A date in the past yields a zero duration.
pub fn parse_header_value(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Some(secs) = parse_seconds(value) {
        return Some(secs);
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let delta = (at - now).to_std().unwrap_or(Duration::ZERO);
    Some(delta)
}

fn from_body(body: &Value) -> Option<Duration> {
    let lookup = |v: &Value| {
        v.get("retryAfter")
            .or_else(|| v.get("retry_after"))
            .and_then(duration_from_json)
    };
    lookup(body).or_else(|| body.get("data").and_then(lookup))
}

fn duration_from_json(value: &Value) -> Option<Duration> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(Duration::from_secs)
            .or_else(|| n.as_f64().and_then(seconds_from_f64)),
        Value::String(s) => parse_seconds(s.trim()),
        _ => None,
    }
}

fn parse_seconds(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value.parse::<f64>().ok().and_then(seconds_from_f64)
}

fn seconds_from_f64(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}
