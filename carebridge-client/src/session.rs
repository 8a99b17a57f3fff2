//! Login, logout and session restore on top of [`ApiClient`].
//!
//! The client itself only writes the credential when a refresh succeeds or
//! fails. Everything else that changes the active session (logging in,
//! registering, logging out, validating a persisted token at startup)
//! happens here.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use carebridge_core::envelope::find_string_field;
use carebridge_core::{ApiError, Secret};

use crate::client::ApiClient;
use crate::policy::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, REGISTER_PATH};
use crate::request::ApiRequest;

/// Email/password credentials for [`AuthSession::login`].
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Session management for a shared [`ApiClient`].
#[derive(Debug, Clone)]
pub struct AuthSession {
    client: ApiClient,
}

impl AuthSession {
    /// Wrap a client. The session writes to the client's credential slot.
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Log in and store the returned access token.
    ///
    /// Returns the user object from the response. A response without an
    /// access token is a decode error and leaves the slot untouched.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Value, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH).with_json(credentials)?;
        let (status, envelope) = self.client.execute(request).await?;

        let token = find_string_field(&envelope.data, "accessToken")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::decode(status.as_u16(), "login response has no accessToken")
            })?;
        self.client.credentials().set(&Secret::new(token)).await;

        info!(email = %credentials.email, "logged in");
        Ok(user_from(envelope.data))
    }

    /// Register a new account.
    ///
    /// If the server logs the new user in straight away (returns an access
    /// token), the token is stored.
    pub async fn register<B: Serialize + ?Sized>(&self, payload: &B) -> Result<Value, ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).with_json(payload)?;
        let envelope = self.client.send(request).await?;

        if let Some(token) = find_string_field(&envelope.data, "accessToken") {
            self.client.credentials().set(&Secret::new(token)).await;
            debug!("registration returned a session");
        }
        Ok(user_from(envelope.data))
    }

    /// The user the current credential belongs to.
    pub async fn current_user(&self) -> Result<Value, ApiError> {
        let envelope = self.client.send(ApiRequest::get(ME_PATH)).await?;
        Ok(user_from(envelope.data))
    }

    /// Validate a persisted session at startup.
    ///
    /// - No stored credential: `Ok(None)` without touching the network.
    /// - `/auth/me` accepts it: the user.
    /// - `/auth/me` answers 401: one refresh, then `/auth/me` again.
    /// - Refresh or the second check fails with 401: the credential is
    ///   cleared and `Ok(None)` is returned.
    ///
    /// Any other failure (backend unreachable, server error) is returned and
    /// the credential is kept, since it may still be valid.
    pub async fn restore(&self) -> Result<Option<Value>, ApiError> {
        if self.client.credentials().get().await.is_none() {
            return Ok(None);
        }

        match self.current_user().await {
            Ok(user) => return Ok(Some(user)),
            Err(e) if e.is_unauthorized() => {}
            Err(e) => return Err(e),
        }

        if self.client.refresh().await.is_err() {
            debug!("stored session expired");
            return Ok(None);
        }

        match self.current_user().await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_unauthorized() => {
                self.client.credentials().clear().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// End the session.
    ///
    /// The credential is cleared whatever the server says. A 401 means the
    /// session was already gone and an unreachable backend cannot revoke the
    /// refresh cookie anyway; both count as success. Other server errors are
    /// returned after clearing.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.send(ApiRequest::post(LOGOUT_PATH)).await;
        self.client.credentials().clear().await;

        match result {
            Ok(_) => {
                info!("logged out");
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                debug!("logout while already logged out");
                Ok(())
            }
            Err(e) if e.is_unreachable() => {
                warn!("backend unreachable during logout, local session cleared");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Pick the user object out of an auth response payload.
///
/// Auth endpoints answer either `{user: {...}, accessToken}` or the user
/// object itself.
fn user_from(data: Value) -> Value {
    match data {
        Value::Object(mut map) => match map.remove("user") {
            Some(user) => user,
            None => {
                map.remove("accessToken");
                Value::Object(map)
            }
        },
        other => other,
    }
}
