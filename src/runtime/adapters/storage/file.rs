//! File-backed storage provider rooted in a capability directory.
//!
//! Each namespace is a sub-directory and each key a file whose name is the
//! base64url encoding of the key, so arbitrary keys never escape the root.

use crate::runtime::ports::{StorageError, StorageProvider, StorageResult, Store, validate_namespace};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent storage provider writing under one root directory.
#[derive(Debug)]
pub struct FileStorageProvider {
    root: Arc<Dir>,
}

impl FileStorageProvider {
    /// Opens (creating if needed) the provider root at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Backend`] when the directory cannot be created
    /// or opened.
    pub fn open(path: &Utf8Path) -> StorageResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority()).map_err(StorageError::backend)?;
        let root = Dir::open_ambient_dir(path, ambient_authority()).map_err(StorageError::backend)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }
}

impl StorageProvider for FileStorageProvider {
    fn open_store(&self, namespace: &str) -> StorageResult<Arc<dyn Store>> {
        validate_namespace(namespace)?;
        self.root
            .create_dir_all(namespace)
            .map_err(StorageError::backend)?;
        let dir = self.root.open_dir(namespace).map_err(StorageError::backend)?;
        Ok(Arc::new(FileStore { dir }))
    }
}

#[derive(Debug)]
struct FileStore {
    dir: Dir,
}

fn file_name_for(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

fn key_for(file_name: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(file_name).ok()?;
    String::from_utf8(bytes).ok()
}

impl Store for FileStore {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let target = file_name_for(key);
        let staging = format!(".{}.tmp", Uuid::new_v4().simple());
        self.dir
            .write(&staging, value)
            .map_err(StorageError::backend)?;
        self.dir
            .rename(&staging, &self.dir, &target)
            .map_err(StorageError::backend)
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.dir.read(file_name_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::backend(err)),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        match self.dir.remove_file(file_name_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::backend(err)),
        }
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in self.dir.entries().map_err(StorageError::backend)? {
            let file_name = entry
                .map_err(StorageError::backend)?
                .file_name()
                .map_err(StorageError::backend)?;
            if file_name.starts_with('.') {
                continue;
            }
            if let Some(key) = key_for(&file_name)
                && key.starts_with(prefix)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}
