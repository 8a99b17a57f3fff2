//! OS keyring-backed credential storage.

use async_trait::async_trait;
use keyring::Entry;

use super::{Secret, SessionStore, StoreError};

/// OS keyring-backed credential store.
///
/// This store uses the platform's native keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// The keyring entry is addressed by `{service_name}` as the service and the
/// slot name as the user.
pub struct KeyringStore {
    service_name: String,
    slot: String,
}

impl KeyringStore {
    /// Try to create a new keyring store.
    ///
    /// Returns an error if the keyring backend is not available on this platform.
    pub fn try_new(service_name: &str, slot: &str) -> Result<Self, StoreError> {
        match Entry::new(service_name, slot) {
            Ok(_) => Ok(Self {
                service_name: service_name.to_string(),
                slot: slot.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, &self.slot).map_err(|e| StoreError::BackendError {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .field("slot", &self.slot)
            .finish()
    }
}

#[async_trait]
impl SessionStore for KeyringStore {
    async fn get(&self) -> Result<Option<Secret>, StoreError> {
        let entry = self.entry()?;

        match entry.get_password() {
            Ok(password) => Ok(Some(Secret::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::PlatformFailure(e)) => Err(StoreError::BackendError {
                message: format!("platform keyring failure: {}", e),
            }),
            Err(e) => Err(StoreError::BackendError {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn set(&self, secret: &Secret) -> Result<(), StoreError> {
        self.entry()?
            .set_password(secret.expose())
            .map_err(|e| StoreError::BackendError {
                message: format!("failed to set keyring password: {}", e),
            })
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::BackendError {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}
