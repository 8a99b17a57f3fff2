//! Carebridge Client Library
//!
//! Authenticated HTTP client for the Carebridge EHR API.
//!
//! # Overview
//!
//! Every domain service (patients, billing, appointments, medications, ...)
//! talks to the API through [`ApiClient`]. The client attaches the bearer
//! credential, recovers from an expired credential by calling the refresh
//! endpoint and retrying once, and turns every outcome into either a
//! normalized [`ApiResponse`] or a single [`ApiError`].
//!
//! # Quick Start
//!
//! ```no_run
//! use carebridge_client::{ApiClient, AuthSession, LoginRequest};
//! use carebridge_core::ClientConfig;
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::from_config(ClientConfig::load()?)?;
//!     let session = AuthSession::new(client.clone());
//!
//!     if session.restore().await?.is_none() {
//!         session
//!             .login(&LoginRequest::new("doc@example.org", "secret"))
//!             .await?;
//!     }
//!
//!     let patient = client.get::<Value>("/v1/patients/1").await?;
//!     println!("{}", patient.data);
//!     Ok(())
//! }
//! ```
//!
//! # Public paths
//!
//! Paths under a prefix in [`ClientConfig::public_paths`] are sent without a
//! credential and a 401 on them never triggers a refresh.
//!
//! [`ClientConfig::public_paths`]: carebridge_core::ClientConfig::public_paths

mod client;
pub mod policy;
pub mod request;
pub mod retry_after;
pub mod session;

pub use client::{ApiClient, ApiClientBuilder, BuildError};
pub use request::ApiRequest;
pub use session::{AuthSession, LoginRequest};

// Re-export the types every caller needs
pub use carebridge_core::{ApiError, ApiResponse, ErrorKind, FieldErrors, RawEnvelope};
