//! In-memory storage provider.

use crate::runtime::ports::{StorageError, StorageProvider, StorageResult, Store, validate_namespace};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory storage provider.
///
/// Stores opened twice under the same namespace share their contents.
#[derive(Debug, Clone, Default)]
pub struct MemStorageProvider {
    stores: Arc<RwLock<HashMap<String, Arc<MemStore>>>>,
}

impl MemStorageProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageProvider for MemStorageProvider {
    fn open_store(&self, namespace: &str) -> StorageResult<Arc<dyn Store>> {
        validate_namespace(namespace)?;
        let mut stores = self
            .stores
            .write()
            .map_err(|err| StorageError::backend(std::io::Error::other(err.to_string())))?;
        let store = stores
            .entry(namespace.to_owned())
            .or_insert_with(|| Arc::new(MemStore::default()))
            .clone();
        Ok(store)
    }
}

#[derive(Debug, Default)]
struct MemStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl Store for MemStore {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|err| StorageError::backend(std::io::Error::other(err.to_string())))?;
        entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|err| StorageError::backend(std::io::Error::other(err.to_string())))?;
        Ok(entries.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|err| StorageError::backend(std::io::Error::other(err.to_string())))?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|err| StorageError::backend(std::io::Error::other(err.to_string())))?;
        Ok(entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn namespaces_are_shared_and_isolated() {
        let provider = MemStorageProvider::new();
        let first = provider.open_store("didexchange").expect("store should open");
        let again = provider.open_store("didexchange").expect("store should open");
        let other = provider.open_store("kms").expect("store should open");

        first.put("conn_1", b"value").expect("put should succeed");

        assert_eq!(again.get("conn_1").expect("get"), Some(b"value".to_vec()));
        assert_eq!(other.get("conn_1").expect("get"), None);
    }

    #[rstest]
    fn keys_filter_by_prefix() {
        let store = MemStorageProvider::new()
            .open_store("records")
            .expect("store should open");
        store.put("conn_b", b"1").expect("put");
        store.put("conn_a", b"2").expect("put");
        store.put("thread_a", b"3").expect("put");

        assert_eq!(store.keys("conn_").expect("keys"), ["conn_a", "conn_b"]);
    }

    #[rstest]
    #[case("")]
    #[case("../escape")]
    fn rejects_path_like_namespaces(#[case] namespace: &str) {
        let result = MemStorageProvider::new().open_store(namespace);
        assert!(matches!(result, Err(StorageError::InvalidNamespace(_))));
    }
}
