//! Agent configuration composition and runtime start.

use super::transport_provisioner::ProvisionedTransports;
use crate::provisioning::domain::{AgentId, AgentOptions, KeyManagementChoice, RemoteKmsSettings};
use crate::runtime::adapters::document_loader::{
    ContextStore, DocumentLoader, DocumentLoaderError, RemoteProviderStore,
};
use crate::runtime::adapters::kms::{
    LocalKms, RemoteCrypto, RemoteKeyManager, create_keystore, key_server_client,
};
use crate::runtime::adapters::storage::{CachedStorageProvider, MemStorageProvider};
use crate::runtime::ports::{DidResolver, KeyBackend, KmsError, StorageProvider};
use crate::runtime::{Agent, AgentConfiguration, AgentRuntimeError, MessageRegistrar};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Everything the composer merges into one agent configuration.
pub struct ComposeRequest {
    /// Identity of the agent being built.
    pub agent_id: AgentId,
    /// Persistent storage backend.
    pub storage: Arc<dyn StorageProvider>,
    /// Local or remote key management.
    pub key_management: KeyManagementChoice,
    /// Resolved inbound listeners and outbound dispatchers.
    pub transports: ProvisionedTransports,
    /// Protocol options.
    pub options: AgentOptions,
    /// Transport return-route option for edge agents.
    pub return_route: Option<String>,
    /// Resolver for public DIDs.
    pub did_resolver: Option<Arc<dyn DidResolver>>,
    /// Custom message services.
    pub registrar: Option<Arc<MessageRegistrar>>,
}

impl std::fmt::Debug for ComposeRequest {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ComposeRequest")
            .field("agent_id", &self.agent_id)
            .field("key_management", &self.key_management)
            .field("transports", &self.transports)
            .field("options", &self.options)
            .field("return_route", &self.return_route)
            .field("did_resolver", &self.did_resolver.is_some())
            .field("registrar", &self.registrar.is_some())
            .finish_non_exhaustive()
    }
}

/// Errors returned while composing or starting an agent.
#[derive(Debug, Clone, Error)]
pub enum ComposeError {
    /// The context or remote-provider store could not be built.
    #[error("document loader setup failed: {0}")]
    DocumentLoaderFailed(#[source] DocumentLoaderError),

    /// The local key store could not be opened or the remote keystore could
    /// not be created.
    #[error("key store setup failed: {0}")]
    KeyStoreSetupFailed(#[source] KmsError),

    /// The runtime failed to start.
    #[error(transparent)]
    Runtime(#[from] AgentRuntimeError),
}

/// Builds immutable agent configurations and starts agents from them.
#[derive(Clone)]
pub struct AgentComposer {
    event_buffer: usize,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AgentComposer {
    /// Creates a composer whose agents use `event_buffer` sized event
    /// channels and read time from `clock`.
    #[must_use]
    pub fn new(event_buffer: usize, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            event_buffer,
            clock,
        }
    }

    /// Builds the configuration for `request` without starting anything.
    ///
    /// The document loader is built before key management, so a loader
    /// failure never leaves a keystore behind on a remote key server.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::KeyStoreSetupFailed`] or
    /// [`ComposeError::DocumentLoaderFailed`].
    pub async fn build(&self, request: ComposeRequest) -> Result<AgentConfiguration, ComposeError> {
        let document_loader = document_loader(&request.storage)
            .map_err(ComposeError::DocumentLoaderFailed)?;
        let keys = key_backend(&request.agent_id, request.storage.as_ref(), &request.key_management)
            .await
            .map_err(ComposeError::KeyStoreSetupFailed)?;

        let (inbound, outbound) = request.transports.into_parts();
        let mut builder = AgentConfiguration::builder(
            request.agent_id,
            request.storage,
            keys,
            document_loader,
        )
        .with_inbound(inbound)
        .with_outbound(outbound)
        .with_options(request.options)
        .with_event_buffer(self.event_buffer)
        .with_clock(Arc::clone(&self.clock));
        if let Some(return_route) = request.return_route {
            builder = builder.with_return_route(return_route);
        }
        if let Some(resolver) = request.did_resolver {
            builder = builder.with_did_resolver(resolver);
        }
        if let Some(registrar) = request.registrar {
            builder = builder.with_registrar(registrar);
        }
        Ok(builder.build())
    }

    /// Builds the configuration and starts the agent runtime.
    ///
    /// # Errors
    ///
    /// Returns the [`AgentComposer::build`] errors, or
    /// [`ComposeError::Runtime`] when a listener cannot bind.
    pub async fn start(&self, request: ComposeRequest) -> Result<Agent, ComposeError> {
        let config = self.build(request).await?;
        Ok(Agent::start(config).await?)
    }
}

impl std::fmt::Debug for AgentComposer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AgentComposer")
            .field("event_buffer", &self.event_buffer)
            .finish_non_exhaustive()
    }
}

async fn key_backend(
    agent_id: &AgentId,
    storage: &dyn StorageProvider,
    choice: &KeyManagementChoice,
) -> Result<KeyBackend, KmsError> {
    match choice {
        KeyManagementChoice::Local => Ok(LocalKms::open(storage)?.into_key_backend()),
        KeyManagementChoice::Remote(settings) => remote_key_backend(agent_id, settings).await,
    }
}

async fn remote_key_backend(
    agent_id: &AgentId,
    settings: &RemoteKmsSettings,
) -> Result<KeyBackend, KmsError> {
    let client = key_server_client(settings.trust_bundle().map(|path| path.as_path()))?;
    let keystore_url = create_keystore(
        &client,
        settings.server_url(),
        settings.controller(),
        settings.vault_id(),
    )
    .await?;
    tracing::debug!(
        agent_id = %agent_id,
        keystore_url = %keystore_url,
        "remote key management bound"
    );

    Ok(KeyBackend::new(
        Arc::new(RemoteKeyManager::new(keystore_url.clone(), client.clone())),
        Arc::new(RemoteCrypto::new(keystore_url, client)),
    ))
}

/// Layers an in-memory cache over the persistent context store.
fn document_loader(storage: &Arc<dyn StorageProvider>) -> Result<DocumentLoader, DocumentLoaderError> {
    let cached = CachedStorageProvider::new(Arc::clone(storage), Arc::new(MemStorageProvider::new()));
    let contexts = ContextStore::open(&cached)?;
    let remote_providers = RemoteProviderStore::open(storage.as_ref())?;
    DocumentLoader::new(contexts, remote_providers, &[])
}
