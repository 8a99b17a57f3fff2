use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use carebridge_core::envelope::{find_string_field, parse_body};
use carebridge_core::{
    ApiError, ApiResponse, ClientConfig, ConfigError, CredentialSlot, ErrorReporter, FieldErrors,
    NoopReporter, RawEnvelope, ReportContext, Secret, create_durable_store, normalize,
};

use crate::policy;
use crate::request::ApiRequest;
use crate::retry_after;

/// Errors raised while constructing an [`ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP transport could not be created.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Authenticated client for the Carebridge API.
///
/// Every call follows the same lifecycle:
///
/// 1. Send the request, with `Authorization: Bearer <token>` unless the path
///    is public.
/// 2. On 2xx, normalize the body into an [`ApiResponse`].
/// 3. On a 401 for a protected, non-auth, retry-eligible request, call the
///    refresh endpoint once. If that yields a new token it is stored and the
///    original request is re-sent exactly once, with no further refresh. If
///    it fails, the credential is cleared and the original 401 is returned.
/// 4. Every other outcome becomes a single [`ApiError`].
///
/// The client is cheap to clone; clones share the transport, the cookie jar
/// holding the refresh cookie and the credential slot.
///
/// # Example
///
/// ```no_run
/// use carebridge_client::ApiClient;
/// use carebridge_core::{ClientConfig, CredentialSlot};
/// use serde_json::{Value, json};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new(ClientConfig::default(), CredentialSlot::volatile_only())?;
///
/// let patient = client.get::<Value>("/v1/patients/1").await?;
/// println!("{}", patient.data);
///
/// let created = client
///     .post::<Value, _>("/v1/patients", &json!({"name": "Test"}))
///     .await?;
/// println!("{:?}", created.message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    slot: CredentialSlot,
    reporter: Arc<dyn ErrorReporter>,
}

impl ApiClient {
    /// Create a client with the default transport and no error reporter.
    pub fn new(config: ClientConfig, slot: CredentialSlot) -> Result<Self, BuildError> {
        Self::builder().config(config).credentials(slot).build()
    }

    /// Create a client whose credential slot is built from `config.session`.
    pub fn from_config(config: ClientConfig) -> Result<Self, BuildError> {
        let durable = create_durable_store(
            config.session.backend,
            config.session.path.clone(),
            &config.session.slot,
        );
        Self::new(config, CredentialSlot::with_durable(durable))
    }

    /// Create a builder for fluent configuration.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The shared credential slot.
    pub fn credentials(&self) -> &CredentialSlot {
        &self.inner.slot
    }

    /// `GET path`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.request(ApiRequest::get(path)).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::post(path).with_json(body)?).await
    }

    /// `POST path` without a body.
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(ApiRequest::post(path)).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::put(path).with_json(body)?).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(ApiRequest::patch(path).with_json(body)?).await
    }

    /// `DELETE path`
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Send a request and decode the payload into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let context = report_context(&request);
        let (status, envelope) = self.execute(request).await?;
        envelope.decode().map_err(|e| {
            let err = ApiError::decode(status.as_u16(), e);
            self.report(&err, &context);
            err
        })
    }

    /// Send a request and return the untyped envelope.
    pub async fn send(&self, request: ApiRequest) -> Result<RawEnvelope, ApiError> {
        self.execute(request).await.map(|(_, envelope)| envelope)
    }

    /// Exchange the refresh cookie for a new access token.
    ///
    /// On success the new token is stored in the credential slot. On any
    /// failure the slot is cleared and a 401 is returned; this is the normal
    /// end of a session and is only logged at debug level.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        match self.try_refresh().await {
            Some(token) => {
                self.inner.slot.set(&token).await;
                if self.inner.config.debug {
                    debug!("access token refreshed");
                }
                Ok(())
            }
            None => {
                self.inner.slot.clear().await;
                if self.inner.config.debug {
                    debug!("refresh failed, credential cleared");
                }
                Err(ApiError::unauthorized())
            }
        }
    }

    pub(crate) async fn execute(
        &self,
        request: ApiRequest,
    ) -> Result<(StatusCode, RawEnvelope), ApiError> {
        let response = self.dispatch(&request).await?;

        if response.status() == StatusCode::UNAUTHORIZED
            && policy::may_refresh(&self.inner.config, &request)
        {
            if self.refresh().await.is_err() {
                return Err(self.unauthorized(&request));
            }
            let retry = request.into_retry();
            let response = self.dispatch(&retry).await?;
            return self.evaluate(&retry, response).await;
        }

        self.evaluate(&request, response).await
    }

    /// Put one request on the wire. Only transport failures are errors here.
    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let config = &self.inner.config;
        let url = config.url_for(request.path());

        if config.debug {
            debug!(
                method = %request.method(),
                url = %url,
                retry = !request.is_retry_eligible(),
                "API request"
            );
        }

        let mut builder = self
            .inner
            .http
            .request(request.method().clone(), &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if policy::attaches_credential(config, request.path()) {
            if let Some(token) = self.inner.slot.get().await {
                builder = builder.bearer_auth(token.expose());
            }
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        match builder.send().await {
            Ok(response) => {
                if config.debug {
                    debug!(
                        method = %request.method(),
                        url = %url,
                        status = response.status().as_u16(),
                        "API response"
                    );
                }
                Ok(response)
            }
            Err(e) => {
                if config.debug {
                    debug!(method = %request.method(), url = %url, "API transport error: {}", e);
                }
                Err(ApiError::unreachable(&config.base_url, e))
            }
        }
    }

    /// Turn a response into an envelope or an error. Never refreshes.
    async fn evaluate(
        &self,
        request: &ApiRequest,
        response: Response,
    ) -> Result<(StatusCode, RawEnvelope), ApiError> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await.map_err(|e| {
                let err = ApiError::decode(status.as_u16(), e);
                self.report(&err, &report_context(request));
                err
            })?;
            return Ok((status, normalize(parse_body(&bytes))));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(self.unauthorized(request));
        }

        let headers = response.headers().clone();
        // An unreadable error body is treated like an empty one.
        let body = match response.bytes().await {
            Ok(bytes) => parse_body(&bytes),
            Err(_) => Value::Null,
        };

        let mut err = error_from_body(status, &body);
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(wait) = retry_after::from_response(&headers, &body) {
                err = err.with_retry_after(wait);
            }
        }

        if self.inner.config.debug {
            debug!(
                method = %request.method(),
                path = request.path(),
                status = status.as_u16(),
                errors = ?err.errors,
                "API error: {}",
                err.message
            );
        }
        self.report(&err, &report_context(request));
        Err(err)
    }

    fn unauthorized(&self, request: &ApiRequest) -> ApiError {
        if self.inner.config.debug {
            debug!(
                method = %request.method(),
                path = request.path(),
                "request unauthorized"
            );
        }
        ApiError::unauthorized()
    }

    /// Call the refresh endpoint. `None` on any failure.
    async fn try_refresh(&self) -> Option<Secret> {
        let config = &self.inner.config;
        let url = config.url_for(&config.refresh_path);

        // No bearer header: the refresh credential travels as a cookie.
        let mut builder = self
            .inner
            .http
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        // A backend that is down during refresh is an expected outcome and
        // is not logged, even in debug mode.
        let response = builder.send().await.ok()?;

        let status = response.status();
        if !status.is_success() {
            if config.debug {
                debug!(status = status.as_u16(), "refresh rejected");
            }
            return None;
        }

        let bytes = response.bytes().await.ok()?;
        let body = parse_body(&bytes);

        match find_string_field(&body, "accessToken") {
            Some(token) if !token.is_empty() => Some(Secret::new(token)),
            _ => {
                if config.debug {
                    debug!("refresh response did not contain an access token");
                }
                None
            }
        }
    }

    fn report(&self, error: &ApiError, context: &ReportContext) {
        if error.is_reportable() {
            self.inner.reporter.report(error, context);
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("credentials", &self.inner.slot)
            .finish()
    }
}

fn report_context(request: &ApiRequest) -> ReportContext {
    ReportContext::new(request.method().as_str(), request.path())
}

/// Build an error from a non-2xx, non-401 response body.
fn error_from_body(status: StatusCode, body: &Value) -> ApiError {
    let message = ["message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ApiError::fallback_message(status.as_u16()));

    let mut err = ApiError::new(status.as_u16(), message);
    if let Some(errors) = body
        .get("errors")
        .and_then(|v| serde_json::from_value::<FieldErrors>(v.clone()).ok())
    {
        err = err.with_errors(errors);
    }
    err
}

/// Builder for creating an [`ApiClient`] with custom collaborators.
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    slot: Option<CredentialSlot>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    http: Option<reqwest::Client>,
}

impl ApiClientBuilder {
    /// Set the configuration. Defaults to [`ClientConfig::default`].
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential slot. Defaults to a volatile-only slot.
    pub fn credentials(mut self, slot: CredentialSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Set the error reporter. Defaults to [`NoopReporter`].
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Use a pre-built transport.
    ///
    /// It should have a cookie store enabled, otherwise the refresh cookie
    /// set at login is not sent to the refresh endpoint.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ApiClient, BuildError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .cookie_store(true)
                .user_agent(concat!("carebridge/", env!("CARGO_PKG_VERSION")))
                .build()?,
        };

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                config,
                slot: self.slot.unwrap_or_default(),
                reporter: self.reporter.unwrap_or_else(|| Arc::new(NoopReporter)),
            }),
        })
    }
}
