//! Integration tests for opt-in debug telemetry.
//!
//! These tests install a capturing subscriber for the current test thread
//! and check that the client emits request diagnostics only when
//! `config.debug` is set.

use std::io;
use std::sync::Arc;

use carebridge_client::ApiClient;
use carebridge_core::{ClientConfig, CredentialSlot, DurableBackend, Secret};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

/// Shared buffer the subscriber writes formatted events into.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture client events at debug level until the guard is dropped.
fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("carebridge_client=debug"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

async fn setup_client(server: &MockServer, debug: bool) -> ApiClient {
    let mut config = ClientConfig::default();
    config.base_url = format!("{}/api", server.uri());
    config.session.backend = DurableBackend::None;
    config.debug = debug;

    let slot = CredentialSlot::volatile_only();
    slot.set(&Secret::new("abc")).await;
    ApiClient::new(config, slot).unwrap()
}

#[tokio::test]
async fn test_debug_enabled_logs_request_and_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/patients/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "1"}})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .mount(&mock_server)
        .await;

    let client = setup_client(&mock_server, true).await;
    let (captured, _guard) = capture();

    client.get::<Value>("/v1/patients/1").await.unwrap();
    client.get::<Value>("/v1/billing").await.unwrap_err();

    let logs = captured.text();
    assert!(logs.contains("API request"), "logs: {}", logs);
    assert!(logs.contains("API response"), "logs: {}", logs);
    assert!(logs.contains("/v1/patients/1"), "logs: {}", logs);
    assert!(logs.contains("API error: boom"), "logs: {}", logs);
}

#[tokio::test]
async fn test_debug_disabled_is_silent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/patients/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "1"}})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/billing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "missing"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = setup_client(&mock_server, false).await;
    let (captured, _guard) = capture();

    client.get::<Value>("/v1/patients/1").await.unwrap();
    client.get::<Value>("/v1/billing").await.unwrap_err();
    client.get::<Value>("/v1/roles").await.unwrap_err();

    assert_eq!(captured.text(), "");
}

#[tokio::test]
async fn test_unauthorized_public_and_auth_paths_are_silent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/hubs"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = setup_client(&mock_server, false).await;
    let (captured, _guard) = capture();

    assert!(client.get::<Value>("/v1/hubs").await.unwrap_err().is_unauthorized());
    assert!(client.get::<Value>("/v1/auth/me").await.unwrap_err().is_unauthorized());

    assert_eq!(captured.text(), "");
}

#[tokio::test]
async fn test_refresh_without_token_is_silent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = setup_client(&mock_server, false).await;
    let (captured, _guard) = capture();

    let err = client.get::<Value>("/v1/roles").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(client.credentials().get().await.is_none());

    assert_eq!(captured.text(), "");
}

#[tokio::test]
async fn test_refresh_without_token_is_logged_in_debug_mode() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/roles"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = setup_client(&mock_server, true).await;
    let (captured, _guard) = capture();

    client.get::<Value>("/v1/roles").await.unwrap_err();

    let logs = captured.text();
    assert!(
        logs.contains("refresh response did not contain an access token"),
        "logs: {}",
        logs
    );
    assert!(logs.contains("refresh failed, credential cleared"), "logs: {}", logs);
}
