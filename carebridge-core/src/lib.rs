//! # Carebridge Core
//!
//! Core library for the Carebridge EHR API client.
//!
//! This crate provides:
//! - The credential type and the single-slot session stores that hold it
//! - [`CredentialSlot`], the volatile-first, write-both credential holder
//! - The normalized response envelope and the [`ApiError`] failure type
//! - The [`ErrorReporter`] capability for unexpected failures
//! - [`ClientConfig`], loaded from TOML and the environment
//!
//! The HTTP side lives in `carebridge-client`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use carebridge_core::{ClientConfig, CredentialSlot, create_durable_store};
//!
//! let config = ClientConfig::load()?;
//! let durable = create_durable_store(
//!     config.session.backend,
//!     config.session.path.clone(),
//!     &config.session.slot,
//! );
//! let slot = CredentialSlot::with_durable(durable);
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod reporter;
pub mod session;

// Re-export commonly used types at crate root
pub use config::{ClientConfig, ConfigError, SessionConfig};

pub use envelope::{ApiResponse, RawEnvelope, normalize};

pub use error::{ApiError, ErrorKind, FieldErrors};

pub use reporter::{ErrorReporter, NoopReporter, ReportContext, TracingReporter};

pub use session::{
    CredentialSlot, DurableBackend, FileStore, Secret, SessionStore, StoreError, VolatileStore,
    create_durable_store,
};

#[cfg(feature = "keyring-store")]
pub use session::KeyringStore;
