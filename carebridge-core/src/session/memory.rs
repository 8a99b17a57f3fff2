//! In-process credential storage.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Secret, SessionStore, StoreError};

/// Volatile credential store.
///
/// Holds the credential for the lifetime of the process only. Replacement
/// swaps the whole value under a single write lock, so readers observe
/// either the old credential or the new one, never a mix.
pub struct VolatileStore {
    slot: RwLock<Option<Secret>>,
}

impl VolatileStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Create a store that already holds a credential.
    pub fn with_secret(secret: Secret) -> Self {
        Self {
            slot: RwLock::new(Some(secret)),
        }
    }
}

impl Default for VolatileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VolatileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolatileStore")
            .field("occupied", &self.slot.read().is_some())
            .finish()
    }
}

#[async_trait]
impl SessionStore for VolatileStore {
    async fn get(&self) -> Result<Option<Secret>, StoreError> {
        Ok(self.slot.read().clone())
    }

    async fn set(&self, secret: &Secret) -> Result<(), StoreError> {
        *self.slot.write() = Some(secret.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.slot.write().take();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "volatile"
    }
}
