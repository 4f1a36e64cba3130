//! The shared engine state every operation handler runs against.
//!
//! One `Arc`-wrapped struct holding configuration, storage, and the
//! auxiliary registries, cheap to clone and share across handler tasks.

use std::sync::Arc;

use cargohold_core::{GatewayConfig, Keystore};

use crate::storage::Backend;

/// The engine: configuration, storage backend, and the keystore every
/// operation handler runs against.
///
/// Path-level locking is owned by the storage backend itself (each
/// `Backend` method acquires the locks it needs internally), so `Engine`
/// does not hold a lock registry of its own.
///
/// `cargohold-http` owns one `Engine` (behind an `Arc`) for the lifetime of
/// the process and clones it per connection.
#[derive(Clone)]
pub struct Engine {
    /// Pluggable storage backend (memory or filesystem).
    pub(crate) storage: Arc<dyn Backend>,
    /// Access-key → user lookup and permission checks.
    pub(crate) keystore: Arc<Keystore>,
    /// Engine-wide configuration.
    pub(crate) config: Arc<GatewayConfig>,
}

impl Engine {
    /// Build a new engine around the given storage backend and configuration.
    #[must_use]
    pub fn new(storage: Arc<dyn Backend>, config: GatewayConfig) -> Self {
        let keystore = Keystore::new(
            config.authentication.users.clone(),
            config.authentication.enabled,
        );
        Self {
            storage,
            keystore: Arc::new(keystore),
            config: Arc::new(config),
        }
    }

    /// The storage backend operations run against.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Backend> {
        &self.storage
    }

    /// The access-key keystore.
    #[must_use]
    pub fn keystore(&self) -> &Keystore {
        &self.keystore
    }

    /// A cheap `Arc` clone of the keystore, for callers (e.g. the SigV4
    /// credential provider) that need owned, 'static access.
    #[must_use]
    pub fn keystore_handle(&self) -> Arc<Keystore> {
        Arc::clone(&self.keystore)
    }

    /// Engine-wide configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}
