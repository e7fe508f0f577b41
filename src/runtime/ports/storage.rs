//! Key-value storage port.

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A namespaced key-value store.
pub trait Store: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the write fails.
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the read fails.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the removal fails.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns all keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when listing fails.
    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Opens namespaced stores for one agent.
pub trait StorageProvider: Send + Sync {
    /// Opens (creating if needed) the store for `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidNamespace`] for empty or path-like
    /// namespaces and [`StorageError::Backend`] for backend failures.
    fn open_store(&self, namespace: &str) -> StorageResult<Arc<dyn Store>>;
}

/// Errors returned by storage adapters.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The namespace is empty or contains path separators.
    #[error("invalid store namespace: '{0}'")]
    InvalidNamespace(String),

    /// A stored value could not be encoded or decoded.
    #[error("stored value for key '{key}' is malformed: {source}")]
    Serialization {
        /// Key of the offending value.
        key: String,
        /// Underlying serde error.
        source: Arc<serde_json::Error>,
    },

    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    /// Wraps a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

/// Checks that `namespace` can be used as a single directory component.
///
/// # Errors
///
/// Returns [`StorageError::InvalidNamespace`] when it cannot.
pub fn validate_namespace(namespace: &str) -> StorageResult<()> {
    let is_valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && !namespace.contains(['/', '\\']);
    if is_valid {
        Ok(())
    } else {
        Err(StorageError::InvalidNamespace(namespace.to_owned()))
    }
}

/// Serialises `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// Returns serialisation or backend errors.
pub fn put_json<T: Serialize>(store: &dyn Store, key: &str, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|err| StorageError::Serialization {
        key: key.to_owned(),
        source: Arc::new(err),
    })?;
    store.put(key, &bytes)
}

/// Loads and deserialises the JSON value stored under `key`.
///
/// # Errors
///
/// Returns deserialisation or backend errors.
pub fn get_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> StorageResult<Option<T>> {
    store
        .get(key)?
        .map(|bytes| {
            serde_json::from_slice(&bytes).map_err(|err| StorageError::Serialization {
                key: key.to_owned(),
                source: Arc::new(err),
            })
        })
        .transpose()
}
