//! The shared credential slot.

use std::sync::Arc;

use super::{Secret, SessionStore, VolatileStore};

/// The single active credential, mirrored into an optional durable store.
///
/// Read order is volatile first, then durable. A durable hit is copied into
/// the volatile store so later reads stay in memory. Writes and clears go to
/// both stores, volatile first.
///
/// Durable failures never fail the caller: they are logged at `warn` and the
/// volatile store stays authoritative for the rest of the process. Cloning a
/// slot is cheap and every clone shares the same stores.
#[derive(Clone)]
pub struct CredentialSlot {
    volatile: Arc<VolatileStore>,
    durable: Option<Arc<dyn SessionStore>>,
}

impl CredentialSlot {
    /// Create a slot with a durable mirror.
    pub fn new(durable: Box<dyn SessionStore>) -> Self {
        Self {
            volatile: Arc::new(VolatileStore::new()),
            durable: Some(Arc::from(durable)),
        }
    }

    /// Create a slot from an optional durable mirror.
    pub fn with_durable(durable: Option<Box<dyn SessionStore>>) -> Self {
        Self {
            volatile: Arc::new(VolatileStore::new()),
            durable: durable.map(Arc::from),
        }
    }

    /// Create a slot that only lives in process memory.
    pub fn volatile_only() -> Self {
        Self::with_durable(None)
    }

    /// Current credential, if any.
    pub async fn get(&self) -> Option<Secret> {
        match self.volatile.get().await {
            Ok(Some(secret)) => return Some(secret),
            Ok(None) => {}
            Err(e) => tracing::warn!("volatile credential read failed: {}", e),
        }

        let durable = self.durable.as_ref()?;
        match durable.get().await {
            Ok(Some(secret)) => {
                tracing::debug!(
                    backend = durable.backend_name(),
                    "restored credential from durable store"
                );
                if let Err(e) = self.volatile.set(&secret).await {
                    tracing::warn!("volatile credential write failed: {}", e);
                }
                Some(secret)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    backend = durable.backend_name(),
                    "durable credential read failed: {}",
                    e
                );
                None
            }
        }
    }

    /// Replace the credential in both stores.
    pub async fn set(&self, secret: &Secret) {
        if let Err(e) = self.volatile.set(secret).await {
            tracing::warn!("volatile credential write failed: {}", e);
        }
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.set(secret).await {
                tracing::warn!(
                    backend = durable.backend_name(),
                    "durable credential write failed: {}",
                    e
                );
            }
        }
    }

    /// Remove the credential from both stores.
    pub async fn clear(&self) {
        if let Err(e) = self.volatile.clear().await {
            tracing::warn!("volatile credential clear failed: {}", e);
        }
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.clear().await {
                tracing::warn!(
                    backend = durable.backend_name(),
                    "durable credential clear failed: {}",
                    e
                );
            }
        }
    }

    /// Whether a durable mirror is configured.
    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }
}

impl Default for CredentialSlot {
    fn default() -> Self {
        Self::volatile_only()
    }
}

impl std::fmt::Debug for CredentialSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSlot")
            .field("volatile", &self.volatile)
            .field(
                "durable",
                &self.durable.as_ref().map(|d| d.backend_name()),
            )
            .finish()
    }
}
