//! Which requests carry a credential and which may trigger a refresh.

use carebridge_core::ClientConfig;

use crate::request::ApiRequest;

/// Login endpoint.
pub const LOGIN_PATH: &str = "/v1/auth/login";
/// Registration endpoint.
pub const REGISTER_PATH: &str = "/v1/auth/register";
/// Logout endpoint.
pub const LOGOUT_PATH: &str = "/v1/auth/logout";
/// Identity endpoint.
pub const ME_PATH: &str = "/v1/auth/me";

/// Path fragments identifying auth endpoints. A 401 from any of these is the
/// answer to the auth question itself, so it never triggers a refresh.
const AUTH_ENDPOINT_MARKERS: &[&str] = &[
    "/auth/login",
    "/auth/register",
    "/auth/refresh",
    "/auth/me",
    "/auth/logout",
];

/// Whether `path` is one of the auth/identity/refresh endpoints.
pub fn is_auth_endpoint(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    AUTH_ENDPOINT_MARKERS
        .iter()
        .any(|marker| path.ends_with(marker) || path.contains(&format!("{}/", marker)))
}

/// Whether the credential should be attached to a request for `path`.
pub fn attaches_credential(config: &ClientConfig, path: &str) -> bool {
    !config.is_public_path(path)
}

/// Whether a 401 for `request` should enter the refresh state.
pub fn may_refresh(config: &ClientConfig, request: &ApiRequest) -> bool {
    request.is_retry_eligible()
        && !config.is_public_path(request.path())
        && !is_auth_endpoint(request.path())
}
