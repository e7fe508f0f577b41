//! JSON-LD context resolution backed by agent storage.
//!
//! Contexts are served from a [`ContextStore`] seeded with the contexts the
//! runtime relies on; remote context providers are recorded in a
//! [`RemoteProviderStore`] so they survive restarts of a persistent agent.

use crate::runtime::did::DID_CONTEXT;
use crate::runtime::ports::{
    StorageError, StorageProvider, StorageResult, Store, get_json, put_json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const CONTEXT_NAMESPACE: &str = "ldcontexts";
const REMOTE_PROVIDER_NAMESPACE: &str = "remoteproviders";

/// DIDComm messaging JSON-LD context.
pub const DIDCOMM_CONTEXT: &str = "https://didcomm.org/messaging/contexts/v2";

/// Errors returned while building or using a document loader.
#[derive(Debug, Clone, Error)]
pub enum DocumentLoaderError {
    /// A backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No context is stored under the URL.
    #[error("JSON-LD context not found: {0}")]
    NotFound(String),
}

/// A JSON-LD context document and the URL it is served under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextDocument {
    /// Context URL.
    pub url: String,
    /// Context body.
    pub document: Value,
}

/// Stores JSON-LD contexts keyed by URL.
#[derive(Clone)]
pub struct ContextStore {
    store: Arc<dyn Store>,
}

impl ContextStore {
    /// Opens the context namespace of `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the namespace cannot be opened.
    pub fn open(provider: &dyn StorageProvider) -> StorageResult<Self> {
        Ok(Self {
            store: provider.open_store(CONTEXT_NAMESPACE)?,
        })
    }

    /// Stores each context, replacing earlier versions.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on the first failed write.
    pub fn import(&self, contexts: &[ContextDocument]) -> StorageResult<()> {
        contexts
            .iter()
            .try_for_each(|context| put_json(self.store.as_ref(), &context.url, &context.document))
    }

    /// Returns the context stored under `url`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the read fails.
    pub fn get(&self, url: &str) -> StorageResult<Option<Value>> {
        get_json(self.store.as_ref(), url)
    }
}

/// A registered remote context provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProviderRecord {
    /// Record identifier.
    pub id: String,
    /// Provider endpoint.
    pub endpoint: String,
}

/// Stores remote context provider endpoints.
#[derive(Clone)]
pub struct RemoteProviderStore {
    store: Arc<dyn Store>,
}

impl RemoteProviderStore {
    /// Opens the remote provider namespace of `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the namespace cannot be opened.
    pub fn open(provider: &dyn StorageProvider) -> StorageResult<Self> {
        Ok(Self {
            store: provider.open_store(REMOTE_PROVIDER_NAMESPACE)?,
        })
    }

    /// Records `endpoint` and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write fails.
    pub fn save(&self, endpoint: &str) -> StorageResult<RemoteProviderRecord> {
        let record = RemoteProviderRecord {
            id: Uuid::new_v4().to_string(),
            endpoint: endpoint.to_owned(),
        };
        put_json(self.store.as_ref(), &record.id, &record)?;
        Ok(record)
    }

    /// Returns all recorded providers.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when listing or decoding fails.
    pub fn get_all(&self) -> StorageResult<Vec<RemoteProviderRecord>> {
        let mut records = Vec::new();
        for key in self.store.keys("")? {
            if let Some(record) = get_json(self.store.as_ref(), &key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Removes the provider record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the removal fails.
    pub fn delete(&self, id: &str) -> StorageResult<()> {
        self.store.delete(id)
    }
}

/// Resolves JSON-LD context URLs to documents.
#[derive(Clone)]
pub struct DocumentLoader {
    contexts: ContextStore,
    remote_providers: RemoteProviderStore,
}

impl DocumentLoader {
    /// Creates a loader, seeding `contexts` with the embedded contexts and
    /// `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentLoaderError::Storage`] when seeding fails.
    pub fn new(
        contexts: ContextStore,
        remote_providers: RemoteProviderStore,
        extra: &[ContextDocument],
    ) -> Result<Self, DocumentLoaderError> {
        contexts.import(&embedded_contexts())?;
        contexts.import(extra)?;
        Ok(Self {
            contexts,
            remote_providers,
        })
    }

    /// Returns the context document stored under `url`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentLoaderError::NotFound`] for unknown URLs.
    pub fn load_document(&self, url: &str) -> Result<Value, DocumentLoaderError> {
        self.contexts
            .get(url)?
            .ok_or_else(|| DocumentLoaderError::NotFound(url.to_owned()))
    }

    /// Returns the remote provider store.
    #[must_use]
    pub const fn remote_providers(&self) -> &RemoteProviderStore {
        &self.remote_providers
    }
}

fn embedded_contexts() -> Vec<ContextDocument> {
    vec![
        ContextDocument {
            url: DID_CONTEXT.to_owned(),
            document: json!({
                "@context": {
                    "@protected": true,
                    "id": "@id",
                    "type": "@type",
                    "controller": { "@id": "https://w3id.org/security#controller", "@type": "@id" },
                    "service": { "@id": "https://www.w3.org/ns/did#service", "@type": "@id" },
                    "verificationMethod": {
                        "@id": "https://w3id.org/security#verificationMethod",
                        "@type": "@id"
                    }
                }
            }),
        },
        ContextDocument {
            url: DIDCOMM_CONTEXT.to_owned(),
            document: json!({
                "@context": {
                    "@protected": true,
                    "id": "@id",
                    "type": "@type",
                    "thid": "https://didcomm.org/messaging#thid",
                    "pthid": "https://didcomm.org/messaging#pthid"
                }
            }),
        },
    ]
}
