//! Read-through cache layered over a persistent provider.

use crate::runtime::ports::{StorageProvider, StorageResult, Store};
use std::sync::Arc;

/// Storage provider that serves reads from a cache provider first.
///
/// Writes go to both providers; misses are filled from the persistent side.
#[derive(Clone)]
pub struct CachedStorageProvider {
    persistent: Arc<dyn StorageProvider>,
    cache: Arc<dyn StorageProvider>,
}

impl CachedStorageProvider {
    /// Layers `cache` over `persistent`.
    #[must_use]
    pub fn new(persistent: Arc<dyn StorageProvider>, cache: Arc<dyn StorageProvider>) -> Self {
        Self { persistent, cache }
    }
}

impl StorageProvider for CachedStorageProvider {
    fn open_store(&self, namespace: &str) -> StorageResult<Arc<dyn Store>> {
        Ok(Arc::new(CachedStore {
            persistent: self.persistent.open_store(namespace)?,
            cache: self.cache.open_store(namespace)?,
        }))
    }
}

struct CachedStore {
    persistent: Arc<dyn Store>,
    cache: Arc<dyn Store>,
}

impl Store for CachedStore {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.persistent.put(key, value)?;
        self.cache.put(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if let Some(value) = self.cache.get(key)? {
            return Ok(Some(value));
        }

        let loaded = self.persistent.get(key)?;
        if let Some(value) = &loaded {
            self.cache.put(key, value)?;
        }
        Ok(loaded)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.persistent.delete(key)?;
        self.cache.delete(key)
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.persistent.keys(prefix)
    }
}
