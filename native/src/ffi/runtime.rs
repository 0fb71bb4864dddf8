//! Process-wide state behind the C boundary: the default hasher and the
//! registry of store handles. Created on first use; `joinly_init` may
//! reconfigure it later.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::NativeConfig;
use crate::crypto::passwords::CredentialHasher;
use crate::error::NativeError;
use crate::logging::init_logging;
use crate::store::{KvStore, StoreConfig};

/// Handle of the store that lives for the whole process.
pub const DEFAULT_STORE: u64 = 0;

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

pub(crate) fn runtime() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        let runtime = Runtime::default();
        let loaded = NativeConfig::from_env();
        // Hosts that never call `joinly_init` still get diagnostics.
        init_logging(loaded.as_ref().ok().and_then(|config| config.log_level.as_deref()));
        let configured = loaded
            .map_err(NativeError::from)
            .and_then(|config| runtime.configure(&config));
        if let Err(err) = configured {
            warn!(%err, "native config unusable, keeping defaults");
        }
        runtime
    })
}

pub(crate) struct Runtime {
    hasher: RwLock<Arc<CredentialHasher>>,
    store_config: RwLock<StoreConfig>,
    stores: DashMap<u64, Arc<KvStore>>,
    next_handle: AtomicU64,
}

impl Default for Runtime {
    fn default() -> Self {
        let stores = DashMap::new();
        stores.insert(DEFAULT_STORE, Arc::new(KvStore::new()));
        Self {
            hasher: RwLock::new(Arc::new(CredentialHasher::default())),
            store_config: RwLock::new(StoreConfig::default()),
            stores,
            next_handle: AtomicU64::new(DEFAULT_STORE + 1),
        }
    }
}

impl Runtime {
    /// Swaps in new hasher parameters and the config used for stores opened
    /// from now on. Existing stores keep their shape.
    pub(crate) fn configure(&self, config: &NativeConfig) -> Result<(), NativeError> {
        config.store.validate()?;
        let hasher = CredentialHasher::new(config.hasher.clone())?;
        *self.hasher.write() = Arc::new(hasher);
        *self.store_config.write() = config.store.clone();
        debug!(
            m = config.hasher.memory_kib,
            t = config.hasher.iterations,
            p = config.hasher.parallelism,
            "native runtime configured"
        );
        Ok(())
    }

    pub(crate) fn hasher(&self) -> Arc<CredentialHasher> {
        Arc::clone(&self.hasher.read())
    }

    pub(crate) fn open_store(&self) -> Result<u64, NativeError> {
        let store = KvStore::with_config(&self.store_config.read())?;
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.stores.insert(handle, Arc::new(store));
        debug!(handle, "store opened");
        Ok(handle)
    }

    pub(crate) fn close_store(&self, handle: u64) -> Result<(), NativeError> {
        if handle == DEFAULT_STORE {
            return Err(NativeError::invalid("the default store cannot be closed"));
        }
        self.stores
            .remove(&handle)
            .map(|_| debug!(handle, "store closed"))
            .ok_or(NativeError::NotFound)
    }

    /// Resolves a handle. The returned `Arc` keeps the store alive for the
    /// duration of a call even if another thread closes the handle meanwhile.
    pub(crate) fn store(&self, handle: u64) -> Result<Arc<KvStore>, NativeError> {
        self.stores
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(NativeError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::passwords::HasherConfig;

    #[test]
    fn default_store_is_always_present() {
        let runtime = Runtime::default();
        assert!(runtime.store(DEFAULT_STORE).is_ok());
        assert!(matches!(
            runtime.close_store(DEFAULT_STORE),
            Err(NativeError::InvalidInput(_))
        ));
    }

    #[test]
    fn handles_are_unique_and_closable() {
        let runtime = Runtime::default();
        let a = runtime.open_store().unwrap();
        let b = runtime.open_store().unwrap();
        assert_ne!(a, b);
        runtime.close_store(a).unwrap();
        assert_eq!(runtime.store(a).err(), Some(NativeError::NotFound));
        assert_eq!(runtime.close_store(a), Err(NativeError::NotFound));
        assert!(runtime.store(b).is_ok());
    }

    #[test]
    fn configure_swaps_hasher_parameters() {
        let runtime = Runtime::default();
        let config = NativeConfig {
            hasher: HasherConfig::with_costs(64, 1, 1),
            ..NativeConfig::default()
        };
        runtime.configure(&config).unwrap();
        assert_eq!(runtime.hasher().config().memory_kib, 64);

        let mut bad = config.clone();
        bad.hasher.parallelism = 0;
        assert!(runtime.configure(&bad).is_err());
        assert_eq!(runtime.hasher().config().memory_kib, 64);
    }

    #[test]
    fn configure_applies_store_config_to_new_stores() {
        let runtime = Runtime::default();
        runtime.store(DEFAULT_STORE).unwrap().set("kept", "yes").unwrap();

        let config = NativeConfig {
            store: StoreConfig {
                shards: Some(4),
                initial_capacity: 512,
            },
            ..NativeConfig::default()
        };
        runtime.configure(&config).unwrap();
        assert_eq!(*runtime.store_config.read(), config.store);
        let handle = runtime.open_store().unwrap();
        assert!(runtime.store(handle).unwrap().capacity() >= 512);
        assert_eq!(runtime.store(DEFAULT_STORE).unwrap().get("kept").unwrap(), b"yes");

        let mut bad = config.clone();
        bad.store.shards = Some(3);
        bad.hasher = HasherConfig::with_costs(64, 1, 1);
        assert!(matches!(runtime.configure(&bad), Err(NativeError::InvalidInput(_))));
        assert_eq!(*runtime.store_config.read(), config.store);
        assert_eq!(runtime.hasher().config().memory_kib, 19 * 1024);
    }
}
