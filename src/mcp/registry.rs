//! Capability registry
//!
//! Holds the single active [`CapabilityConfig`]. The config is stored as an
//! `Arc` behind a `RwLock`: readers clone the `Arc` and release the lock, so a
//! concurrent swap is observed entirely or not at all.

use crate::models::CapabilityConfig;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Capability configuration not loaded")]
    NotLoaded,
}

/// Owner of the active capability configuration
///
/// Created empty; populated by [`load`](Self::load) and replaced wholesale by
/// [`swap_if_changed`](Self::swap_if_changed). Every replacement bumps a
/// generation counter observable through [`subscribe`](Self::subscribe).
///
/// # Examples
///
/// ```rust
/// use dynamcp::mcp::CapabilityRegistry;
/// use dynamcp::models::CapabilityConfig;
///
/// # async fn example() {
/// let registry = CapabilityRegistry::new();
/// registry.load(CapabilityConfig::default()).await;
///
/// let changed = registry.swap_if_changed(CapabilityConfig::default()).await;
/// assert!(!changed);
/// # }
/// ```
pub struct CapabilityRegistry {
    active: RwLock<Option<Arc<CapabilityConfig>>>,
    generation: watch::Sender<u64>,
}

pub type SharedRegistry = Arc<CapabilityRegistry>;

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            active: RwLock::new(None),
            generation,
        }
    }

    /// Replaces the active config unconditionally
    pub async fn load(&self, config: CapabilityConfig) {
        let mut active = self.active.write().await;
        *active = Some(Arc::new(config));
        self.generation.send_modify(|g| *g += 1);
    }

    /// Returns the active config
    ///
    /// # Errors
    ///
    /// * `RegistryError::NotLoaded` - nothing has been loaded yet
    pub async fn current(&self) -> Result<Arc<CapabilityConfig>, RegistryError> {
        self.active
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(RegistryError::NotLoaded)
    }

    /// Replaces the active config when `candidate` differs structurally
    ///
    /// Comparison covers the whole document, including sequence order. An
    /// empty registry always takes the candidate.
    ///
    /// # Returns
    ///
    /// `true` when the active config was replaced
    pub async fn swap_if_changed(&self, candidate: CapabilityConfig) -> bool {
        let mut active = self.active.write().await;
        if active.as_deref() == Some(&candidate) {
            return false;
        }

        *active = Some(Arc::new(candidate));
        self.generation.send_modify(|g| *g += 1);
        true
    }

    pub fn is_loaded(&self) -> bool {
        *self.generation.borrow() > 0
    }

    /// Number of times the active config has been replaced
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that is notified on every replacement
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}
