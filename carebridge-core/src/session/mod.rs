//! Credential storage.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for the bearer token that prevents accidental logging
//! - [`SessionStore`] - Trait for single-slot credential storage backends
//! - [`VolatileStore`] - In-process storage that lives as long as the session
//! - [`FileStore`] - Durable JSON file storage that survives restarts
//! - [`KeyringStore`] - OS keyring storage (with `keyring-store` feature)
//! - [`CredentialSlot`] - The volatile-first, write-both composition the client uses
//! - [`create_durable_store`] - Helper to select a durable backend
//!
//! # Slot Convention
//!
//! Every store holds exactly one credential under a named slot. The default
//! slot is [`DEFAULT_SLOT`] (`authToken`).
//!
//! # Example
//!
//! ```rust,ignore
//! use carebridge_core::session::{CredentialSlot, Secret, VolatileStore};
//!
//! let slot = CredentialSlot::volatile_only();
//! slot.set(&Secret::new("abc")).await;
//! assert_eq!(slot.get().await.unwrap().expose(), "abc");
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;
mod slot;

pub use file::FileStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;
pub use memory::VolatileStore;
pub use slot::CredentialSlot;

/// Name of the durable slot the bearer token is persisted under.
pub const DEFAULT_SLOT: &str = "authToken";

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose) and is
/// zeroed when the secret is dropped. Debug and Display implementations show
/// `[REDACTED]` instead of the value.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }

    /// Whether the secret holds an empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// I/O error reading or writing a durable store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No platform data directory could be determined.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Abstraction over single-slot credential storage backends.
///
/// Implementations include:
/// - [`VolatileStore`] - process memory
/// - [`FileStore`] - JSON file in the platform data directory
/// - [`KeyringStore`] (with `keyring-store` feature) - OS keyring
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Retrieve the stored credential.
    ///
    /// Returns `Ok(None)` if the slot is empty.
    async fn get(&self) -> Result<Option<Secret>, StoreError>;

    /// Replace the stored credential.
    async fn set(&self, secret: &Secret) -> Result<(), StoreError>;

    /// Remove the stored credential.
    ///
    /// Returns `Ok(())` even if the slot was already empty.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Short backend name used in log events.
    fn backend_name(&self) -> &'static str;
}

/// Which durable backend mirrors the volatile credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    /// OS keyring, falling back to the file store when unavailable.
    Keyring,
    /// JSON file in the platform data directory.
    #[default]
    File,
    /// No durable mirror; the credential lives only for the process.
    None,
}

/// Create a durable session store for the requested backend.
///
/// # Backend Selection Logic
///
/// - [`DurableBackend::Keyring`] with the `keyring-store` feature enabled:
///   tries a [`KeyringStore`], falling back to [`FileStore`] with a warning
/// - [`DurableBackend::File`]: a [`FileStore`] at `path`, or at
///   [`FileStore::default_path`] when `path` is `None`
/// - [`DurableBackend::None`]: no durable store
///
/// A file store that cannot resolve a location degrades to `None` with a
/// warning; the client keeps working with the volatile slot alone.
pub fn create_durable_store(
    backend: DurableBackend,
    path: Option<PathBuf>,
    slot: &str,
) -> Option<Box<dyn SessionStore>> {
    #[cfg(feature = "keyring-store")]
    if backend == DurableBackend::Keyring {
        match KeyringStore::try_new("carebridge", slot) {
            Ok(store) => {
                tracing::debug!("Using OS keyring for durable credential storage");
                return Some(Box::new(store));
            }
            Err(e) => {
                tracing::warn!(
                    "Keyring unavailable ({}), falling back to file storage",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if backend == DurableBackend::Keyring {
        tracing::warn!(
            "Keyring storage requested but keyring-store feature not enabled. \
             Using file storage."
        );
    }

    if backend == DurableBackend::None {
        tracing::debug!("Durable credential storage disabled");
        return None;
    }

    let path = match path.map(Ok).unwrap_or_else(FileStore::default_path) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                "No location for durable credential storage ({}). \
                 Sessions will not persist across restarts.",
                e
            );
            return None;
        }
    };

    tracing::debug!("Using file {:?} for durable credential storage", path);
    Some(Box::new(FileStore::new(path, slot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_debug_redacted() {
        let secret = Secret::new("super-secret");
        let debug = format!("{:?}", secret);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_secret_display_redacted() {
        let secret = Secret::new("super-secret");
        let display = format!("{}", secret);
        assert!(!display.contains("super-secret"));
        assert!(display.contains("REDACTED"));
    }

    #[test]
    fn test_secret_into_inner() {
        let secret = Secret::new("abc");
        assert_eq!(secret.into_inner(), "abc");
    }

    #[test]
    fn test_secret_serializes_as_plain_string() {
        let json = serde_json::to_string(&Secret::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_durable_backend_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: DurableBackend,
        }
        let parsed: Wrapper = toml::from_str("backend = \"keyring\"").unwrap();
        assert_eq!(parsed.backend, DurableBackend::Keyring);
    }

    #[tokio::test]
    async fn test_create_durable_store_none() {
        assert!(create_durable_store(DurableBackend::None, None, DEFAULT_SLOT).is_none());
    }

    #[tokio::test]
    async fn test_create_durable_store_file_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = create_durable_store(DurableBackend::File, Some(path.clone()), DEFAULT_SLOT)
            .unwrap();

        assert_eq!(store.backend_name(), "file");
        store.set(&Secret::new("persisted")).await.unwrap();
        assert!(path.exists());
    }
}
