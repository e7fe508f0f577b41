//! Service layer turning agent requests into registered, reachable agents.

use super::composer::{AgentComposer, ComposeError, ComposeRequest};
use super::port_allocator::PortAllocator;
use super::readiness::{ReadinessError, ReadinessProber};
use super::transport_provisioner::{TransportProvisionError, TransportProvisioner};
use crate::config::{HarnessConfig, StorageKind};
use crate::provisioning::adapters::LoopbackPortBinder;
use crate::provisioning::domain::{
    AgentId, AgentOptions, InboundRequest, KeyManagementChoice, ProvisioningDomainError,
    RETURN_ROUTE_ALL,
};
use crate::registry::{AgentRegistry, RegistryError, RunningAgent};
use crate::runtime::adapters::document_loader::DocumentLoaderError;
use crate::runtime::adapters::storage::{FileStorageProvider, MemStorageProvider};
use crate::runtime::adapters::vdr::HttpBindingResolver;
use crate::runtime::ports::{DidResolver, KmsError, StorageError, StorageProvider};
use crate::runtime::{AgentRuntimeError, MessageRegistrar};
use camino::Utf8PathBuf;
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// HTTP-binding DID resolver to attach to an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DidResolverSettings {
    /// Resolver base URL; DIDs are fetched from `{url}/{did}`.
    pub url: String,
    /// The only DID method the resolver accepts.
    pub method: String,
}

impl DidResolverSettings {
    /// Creates resolver settings.
    #[must_use]
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}

/// Request payload for an agent with inbound listeners.
#[derive(Debug, Clone)]
pub struct CreateAgentRequest {
    /// Caller-chosen identity.
    pub agent_id: String,
    /// Listeners to bind.
    pub inbound: InboundRequest,
    /// Local or remote key management.
    pub key_management: KeyManagementChoice,
    /// Protocol options.
    pub options: AgentOptions,
    /// Optional public-DID resolver.
    pub did_resolver: Option<DidResolverSettings>,
    /// Optional custom message services.
    pub registrar: Option<Arc<MessageRegistrar>>,
}

impl CreateAgentRequest {
    /// Creates a request with local keys and DIDComm v1 options.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, inbound: InboundRequest) -> Self {
        Self {
            agent_id: agent_id.into(),
            inbound,
            key_management: KeyManagementChoice::Local,
            options: AgentOptions::default(),
            did_resolver: None,
            registrar: None,
        }
    }

    /// Selects the key-management backend.
    #[must_use]
    pub fn with_key_management(mut self, choice: KeyManagementChoice) -> Self {
        self.key_management = choice;
        self
    }

    /// Replaces the protocol options.
    #[must_use]
    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    /// Attaches an HTTP-binding DID resolver.
    #[must_use]
    pub fn with_did_resolver(mut self, settings: DidResolverSettings) -> Self {
        self.did_resolver = Some(settings);
        self
    }

    /// Attaches a message registrar.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Arc<MessageRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }
}

/// Request payload for an outbound-only agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEdgeAgentRequest {
    /// Caller-chosen identity.
    pub agent_id: String,
    /// Comma-separated outbound schemes.
    pub outbound_schemes: String,
    /// Transport return-route option; only `all` is accepted.
    pub return_route: String,
    /// Protocol options.
    pub options: AgentOptions,
}

impl CreateEdgeAgentRequest {
    /// Creates an edge-agent request with DIDComm v1 options.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        outbound_schemes: impl Into<String>,
        return_route: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            outbound_schemes: outbound_schemes.into(),
            return_route: return_route.into(),
            options: AgentOptions::default(),
        }
    }

    /// Replaces the protocol options.
    #[must_use]
    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }
}

/// Errors returned while provisioning an agent. Every variant names the agent.
#[derive(Debug, Clone, Error)]
pub enum ProvisioningError {
    /// The request itself is invalid.
    #[error("invalid request for agent {agent_id}: {source}")]
    InvalidRequest {
        /// Requested identity, possibly invalid itself.
        agent_id: String,
        /// Validation failure.
        source: ProvisioningDomainError,
    },

    /// Transport resolution failed.
    #[error("transport provisioning failed for agent {agent_id}: {source}")]
    Transport {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Transport failure.
        source: TransportProvisionError,
    },

    /// The agent's storage could not be opened.
    #[error("storage setup failed for agent {agent_id}: {source}")]
    StorageSetupFailed {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Storage failure.
        source: StorageError,
    },

    /// The DID resolver client could not be built.
    #[error("DID resolver setup failed for agent {agent_id}: {reason}")]
    ResolverSetupFailed {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Failure description.
        reason: String,
    },

    /// Key management could not be set up.
    #[error("key store setup failed for agent {agent_id}: {source}")]
    KeyStoreSetupFailed {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Key-management failure.
        source: KmsError,
    },

    /// The document loader could not be built.
    #[error("document loader setup failed for agent {agent_id}: {source}")]
    DocumentLoaderFailed {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Loader failure.
        source: DocumentLoaderError,
    },

    /// The runtime failed to start, typically because a listener could not
    /// bind its resolved address.
    #[error("runtime start failed for agent {agent_id}: {source}")]
    Runtime {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Runtime failure.
        source: AgentRuntimeError,
    },

    /// A listener did not become reachable in time.
    #[error("agent {agent_id} not ready: {source}")]
    Readiness {
        /// Agent being provisioned.
        agent_id: AgentId,
        /// Readiness failure naming the address.
        source: ReadinessError,
    },

    /// Registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ProvisioningError {
    fn composing(agent_id: &AgentId, err: ComposeError) -> Self {
        let agent_id = agent_id.clone();
        match err {
            ComposeError::KeyStoreSetupFailed(source) => Self::KeyStoreSetupFailed { agent_id, source },
            ComposeError::DocumentLoaderFailed(source) => {
                Self::DocumentLoaderFailed { agent_id, source }
            }
            ComposeError::Runtime(source) => Self::Runtime { agent_id, source },
        }
    }
}

/// Storage backend choice with its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AgentStorage {
    File(Utf8PathBuf),
    Memory,
}

/// Provisions agents and records them in an [`AgentRegistry`].
#[derive(Debug, Clone)]
pub struct AgentLifecycleService {
    registry: Arc<AgentRegistry>,
    provisioner: TransportProvisioner,
    composer: AgentComposer,
    prober: ReadinessProber,
    listen_timeout: Duration,
    storage: AgentStorage,
    trust_bundle: Utf8PathBuf,
}

impl AgentLifecycleService {
    /// Creates a service using loopback port discovery and the system clock.
    #[must_use]
    pub fn from_config(registry: Arc<AgentRegistry>, config: &HarnessConfig) -> Self {
        let allocator = PortAllocator::new(Arc::new(LoopbackPortBinder::new()));
        Self::new(registry, allocator, Arc::new(DefaultClock), config)
    }

    /// Creates a service with an explicit port allocator and clock.
    #[must_use]
    pub fn new(
        registry: Arc<AgentRegistry>,
        allocator: PortAllocator,
        clock: Arc<dyn Clock + Send + Sync>,
        config: &HarnessConfig,
    ) -> Self {
        let storage = match config.storage {
            StorageKind::File => AgentStorage::File(config.db_root()),
            StorageKind::Memory => AgentStorage::Memory,
        };
        Self {
            registry,
            provisioner: TransportProvisioner::new(allocator, config.port_attempts),
            composer: AgentComposer::new(config.event_buffer, clock),
            prober: ReadinessProber::new(config.readiness_poll_interval()),
            listen_timeout: config.listen_timeout(),
            storage,
            trust_bundle: config.tls_cert(),
        }
    }

    /// Returns the registry agents are recorded in.
    #[must_use]
    pub const fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Provisions, starts, probes and registers an agent with listeners.
    ///
    /// Nothing is rolled back when a late step fails: an agent that fails
    /// its readiness probe is dropped, which stops its listeners, but files
    /// written to its store stay behind.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError`] naming the agent for invalid requests,
    /// transport, storage, key-management, document-loader, runtime,
    /// readiness and registration failures.
    pub async fn create_agent(
        &self,
        request: CreateAgentRequest,
    ) -> Result<Arc<RunningAgent>, ProvisioningError> {
        let agent_id = self.new_identity(&request.agent_id)?;
        let transports = self.provisioner.resolve(&request.inbound).map_err(|source| {
            ProvisioningError::Transport {
                agent_id: agent_id.clone(),
                source,
            }
        })?;
        let did_resolver = request
            .did_resolver
            .as_ref()
            .map(|settings| resolver(&agent_id, settings))
            .transpose()?;

        let agent = self
            .composer
            .start(ComposeRequest {
                agent_id: agent_id.clone(),
                storage: self.open_storage(&agent_id)?,
                key_management: self.anchor_trust(request.key_management),
                transports,
                options: request.options,
                return_route: None,
                did_resolver,
                registrar: request.registrar,
            })
            .await
            .map_err(|err| ProvisioningError::composing(&agent_id, err))?;

        for binding in agent.bindings() {
            let address = binding.address();
            self.prober
                .wait_until_reachable(&address, self.listen_timeout)
                .await
                .map_err(|source| ProvisioningError::Readiness {
                    agent_id: agent_id.clone(),
                    source,
                })?;
            tracing::debug!(
                agent_id = %agent_id,
                scheme = %binding.scheme(),
                address = %address,
                "agent listening"
            );
        }

        self.register(&agent_id, agent)
    }

    /// Provisions, starts and registers an outbound-only agent.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::InvalidRequest`] for any return-route
    /// option other than `all`, and the [`Self::create_agent`] errors
    /// otherwise.
    pub async fn create_edge_agent(
        &self,
        request: CreateEdgeAgentRequest,
    ) -> Result<Arc<RunningAgent>, ProvisioningError> {
        if request.return_route != RETURN_ROUTE_ALL {
            return Err(ProvisioningError::InvalidRequest {
                agent_id: request.agent_id,
                source: ProvisioningDomainError::UnsupportedReturnRoute(request.return_route),
            });
        }

        let agent_id = self.new_identity(&request.agent_id)?;
        let transports = self
            .provisioner
            .resolve_outbound_only(&request.outbound_schemes)
            .map_err(|source| ProvisioningError::Transport {
                agent_id: agent_id.clone(),
                source,
            })?;

        let agent = self
            .composer
            .start(ComposeRequest {
                agent_id: agent_id.clone(),
                storage: self.open_storage(&agent_id)?,
                key_management: KeyManagementChoice::Local,
                transports,
                options: request.options,
                return_route: Some(request.return_route),
                did_resolver: None,
                registrar: None,
            })
            .await
            .map_err(|err| ProvisioningError::composing(&agent_id, err))?;

        self.register(&agent_id, agent)
    }

    /// Gives remote key management the configured trust bundle unless the
    /// request names its own.
    fn anchor_trust(&self, choice: KeyManagementChoice) -> KeyManagementChoice {
        match choice {
            KeyManagementChoice::Remote(settings) if settings.trust_bundle().is_none() => {
                KeyManagementChoice::Remote(settings.with_trust_bundle(self.trust_bundle.clone()))
            }
            other => other,
        }
    }

    fn new_identity(&self, requested: &str) -> Result<AgentId, ProvisioningError> {
        let agent_id =
            AgentId::new(requested).map_err(|source| ProvisioningError::InvalidRequest {
                agent_id: requested.to_owned(),
                source,
            })?;
        if self.registry.contains(agent_id.as_str()) {
            return Err(RegistryError::DuplicateAgent(agent_id).into());
        }
        Ok(agent_id)
    }

    fn open_storage(
        &self,
        agent_id: &AgentId,
    ) -> Result<Arc<dyn StorageProvider>, ProvisioningError> {
        match &self.storage {
            AgentStorage::Memory => Ok(Arc::new(MemStorageProvider::new())),
            AgentStorage::File(root) => {
                let path = root.join(format!("{agent_id}{}", Uuid::new_v4()));
                let provider = FileStorageProvider::open(&path).map_err(|source| {
                    ProvisioningError::StorageSetupFailed {
                        agent_id: agent_id.clone(),
                        source,
                    }
                })?;
                Ok(Arc::new(provider))
            }
        }
    }

    fn register(
        &self,
        agent_id: &AgentId,
        agent: crate::runtime::Agent,
    ) -> Result<Arc<RunningAgent>, ProvisioningError> {
        let running = RunningAgent::new(agent).map_err(|source| ProvisioningError::Runtime {
            agent_id: agent_id.clone(),
            source,
        })?;
        let entry = self.registry.register(running)?;
        tracing::info!(
            agent_id = %agent_id,
            endpoint = entry.context().service_endpoint().as_deref().unwrap_or("none"),
            "agent provisioned"
        );
        Ok(entry)
    }
}

fn resolver(
    agent_id: &AgentId,
    settings: &DidResolverSettings,
) -> Result<Arc<dyn DidResolver>, ProvisioningError> {
    let client = reqwest::Client::builder().build().map_err(|err| {
        ProvisioningError::ResolverSetupFailed {
            agent_id: agent_id.clone(),
            reason: err.to_string(),
        }
    })?;
    Ok(Arc::new(HttpBindingResolver::new(
        &settings.url,
        settings.method.clone(),
        client,
    )))
}
