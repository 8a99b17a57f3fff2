//! Outbound request descriptor.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use carebridge_core::ApiError;

/// A single API call: method, path relative to the base URL, optional JSON
/// body, and whether a 401 may trigger a refresh-and-retry.
///
/// Requests are built fresh per call. The only derived request is the retry,
/// produced by [`into_retry`](Self::into_retry), which can never be retried
/// again.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    retry_eligible: bool,
}

impl ApiRequest {
    /// Create a retry-eligible request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retry_eligible: true,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a body serialized to JSON.
    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(ApiError::encode)?;
        Ok(self.with_body(value))
    }

    /// Attach an already-built JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Never refresh-and-retry this request on 401.
    pub fn no_retry(mut self) -> Self {
        self.retry_eligible = false;
        self
    }

    /// The one-shot retry of this request.
    pub fn into_retry(self) -> Self {
        self.no_retry()
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Whether a 401 may still trigger a refresh.
    pub fn is_retry_eligible(&self) -> bool {
        self.retry_eligible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_requests_are_retry_eligible() {
        let req = ApiRequest::get("/v1/patients/1");
        assert_eq!(req.method(), &Method::GET);
        assert_eq!(req.path(), "/v1/patients/1");
        assert!(req.body().is_none());
        assert!(req.is_retry_eligible());
    }

    #[test]
    fn test_retry_keeps_everything_but_eligibility() {
        let req = ApiRequest::post("/v1/patients")
            .with_json(&json!({"name": "Test"}))
            .unwrap();
        let retry = req.clone().into_retry();

        assert_eq!(retry.method(), req.method());
        assert_eq!(retry.path(), req.path());
        assert_eq!(retry.body(), req.body());
        assert!(!retry.is_retry_eligible());
    }

    #[test]
    fn test_with_json_serializes_structs() {
        #[derive(Serialize)]
        struct NewPatient<'a> {
            name: &'a str,
        }

        let req = ApiRequest::put("/v1/patients/1")
            .with_json(&NewPatient { name: "Test" })
            .unwrap();
        assert_eq!(req.body(), Some(&json!({"name": "Test"})));
    }

    #[test]
    fn test_with_json_rejects_unserializable() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let err = ApiRequest::patch("/v1/x").with_json(&bad).unwrap_err();
        assert_eq!(err.kind(), carebridge_core::ErrorKind::Serialization);
    }
}
