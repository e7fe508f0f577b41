//! Immutable agent configuration.

use super::adapters::document_loader::DocumentLoader;
use super::registrar::MessageRegistrar;
use crate::provisioning::domain::{AgentId, AgentOptions, TransportBinding};
use crate::runtime::ports::{
    DidResolver, InboundTransport, KeyBackend, OutboundTransport, StorageProvider,
};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;

const DEFAULT_EVENT_BUFFER: usize = 64;

/// Everything needed to start one agent.
///
/// Built once through [`AgentConfigurationBuilder`] and consumed by
/// [`Agent::start`](super::Agent::start).
pub struct AgentConfiguration {
    label: AgentId,
    storage: Arc<dyn StorageProvider>,
    keys: KeyBackend,
    document_loader: DocumentLoader,
    inbound: Vec<Arc<dyn InboundTransport>>,
    outbound: Vec<Arc<dyn OutboundTransport>>,
    options: AgentOptions,
    return_route: Option<String>,
    did_resolver: Option<Arc<dyn DidResolver>>,
    registrar: Option<Arc<MessageRegistrar>>,
    event_buffer: usize,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl AgentConfiguration {
    /// Starts a builder from the mandatory collaborators.
    #[must_use]
    pub fn builder(
        label: AgentId,
        storage: Arc<dyn StorageProvider>,
        keys: KeyBackend,
        document_loader: DocumentLoader,
    ) -> AgentConfigurationBuilder {
        AgentConfigurationBuilder {
            config: Self {
                label,
                storage,
                keys,
                document_loader,
                inbound: Vec::new(),
                outbound: Vec::new(),
                options: AgentOptions::default(),
                return_route: None,
                did_resolver: None,
                registrar: None,
                event_buffer: DEFAULT_EVENT_BUFFER,
                clock: Arc::new(DefaultClock),
            },
        }
    }

    /// Returns the agent identity.
    #[must_use]
    pub const fn label(&self) -> &AgentId {
        &self.label
    }

    /// Returns the inbound bindings in order.
    #[must_use]
    pub fn bindings(&self) -> Vec<TransportBinding> {
        self.inbound
            .iter()
            .map(|transport| transport.binding().clone())
            .collect()
    }

    /// Returns the outbound dispatcher names in order.
    #[must_use]
    pub fn outbound_names(&self) -> Vec<&'static str> {
        self.outbound.iter().map(|transport| transport.name()).collect()
    }

    /// Returns the agent options.
    #[must_use]
    pub const fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Returns the return-route option.
    #[must_use]
    pub fn return_route(&self) -> Option<&str> {
        self.return_route.as_deref()
    }

    /// Returns the event channel capacity.
    #[must_use]
    pub const fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    pub(super) fn into_parts(self) -> ConfigurationParts {
        ConfigurationParts {
            label: self.label,
            storage: self.storage,
            keys: self.keys,
            document_loader: self.document_loader,
            inbound: self.inbound,
            outbound: self.outbound,
            options: self.options,
            return_route: self.return_route,
            did_resolver: self.did_resolver,
            registrar: self.registrar,
            event_buffer: self.event_buffer,
            clock: self.clock,
        }
    }
}

impl std::fmt::Debug for AgentConfiguration {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AgentConfiguration")
            .field("label", &self.label)
            .field("bindings", &self.bindings())
            .field("outbound", &self.outbound_names())
            .field("options", &self.options)
            .field("return_route", &self.return_route)
            .finish_non_exhaustive()
    }
}

pub(super) struct ConfigurationParts {
    pub(super) label: AgentId,
    pub(super) storage: Arc<dyn StorageProvider>,
    pub(super) keys: KeyBackend,
    pub(super) document_loader: DocumentLoader,
    pub(super) inbound: Vec<Arc<dyn InboundTransport>>,
    pub(super) outbound: Vec<Arc<dyn OutboundTransport>>,
    pub(super) options: AgentOptions,
    pub(super) return_route: Option<String>,
    pub(super) did_resolver: Option<Arc<dyn DidResolver>>,
    pub(super) registrar: Option<Arc<MessageRegistrar>>,
    pub(super) event_buffer: usize,
    pub(super) clock: Arc<dyn Clock + Send + Sync>,
}

/// Builder for [`AgentConfiguration`].
pub struct AgentConfigurationBuilder {
    config: AgentConfiguration,
}

impl AgentConfigurationBuilder {
    /// Sets the inbound listeners.
    #[must_use]
    pub fn with_inbound(mut self, inbound: Vec<Arc<dyn InboundTransport>>) -> Self {
        self.config.inbound = inbound;
        self
    }

    /// Sets the outbound dispatchers.
    #[must_use]
    pub fn with_outbound(mut self, outbound: Vec<Arc<dyn OutboundTransport>>) -> Self {
        self.config.outbound = outbound;
        self
    }

    /// Sets key and media type options.
    #[must_use]
    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Sets the transport return-route option.
    #[must_use]
    pub fn with_return_route(mut self, return_route: impl Into<String>) -> Self {
        self.config.return_route = Some(return_route.into());
        self
    }

    /// Sets the DID resolver.
    #[must_use]
    pub fn with_did_resolver(mut self, resolver: Arc<dyn DidResolver>) -> Self {
        self.config.did_resolver = Some(resolver);
        self
    }

    /// Sets the message registrar.
    #[must_use]
    pub fn with_registrar(mut self, registrar: Arc<MessageRegistrar>) -> Self {
        self.config.registrar = Some(registrar);
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub const fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.config.event_buffer = capacity;
        self
    }

    /// Sets the clock used for record timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.config.clock = clock;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> AgentConfiguration {
        self.config
    }
}
