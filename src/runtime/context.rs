//! Execution context shared by an agent's protocol services.

use super::adapters::document_loader::DocumentLoader;
use super::events::EventBus;
use super::messenger::Messenger;
use super::registrar::MessageRegistrar;
use crate::provisioning::domain::{AgentId, AgentOptions, TransportBinding};
use crate::runtime::ports::{DidResolver, KeyBackend, StorageProvider};
use mockable::Clock;
use std::sync::Arc;

/// Handles to everything a protocol service needs from its agent.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AgentContext {
    pub(super) agent_id: AgentId,
    pub(super) storage: Arc<dyn StorageProvider>,
    pub(super) keys: KeyBackend,
    pub(super) document_loader: DocumentLoader,
    pub(super) messenger: Messenger,
    pub(super) events: EventBus,
    pub(super) bindings: Arc<[TransportBinding]>,
    pub(super) options: AgentOptions,
    pub(super) return_route: Option<String>,
    pub(super) did_resolver: Option<Arc<dyn DidResolver>>,
    pub(super) registrar: Option<Arc<MessageRegistrar>>,
    pub(super) clock: Arc<dyn Clock + Send + Sync>,
}

impl AgentContext {
    /// Returns the agent identity.
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Returns the storage provider.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Returns the key-management backend.
    #[must_use]
    pub const fn keys(&self) -> &KeyBackend {
        &self.keys
    }

    /// Returns the JSON-LD document loader.
    #[must_use]
    pub const fn document_loader(&self) -> &DocumentLoader {
        &self.document_loader
    }

    /// Returns the outbound messenger.
    #[must_use]
    pub const fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Returns the event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns the inbound bindings in configuration order.
    #[must_use]
    pub fn bindings(&self) -> &[TransportBinding] {
        &self.bindings
    }

    /// Returns the URL peers should send messages to, if the agent has an
    /// inbound transport.
    #[must_use]
    pub fn service_endpoint(&self) -> Option<String> {
        self.bindings.first().map(TransportBinding::advertised_url)
    }

    /// Returns the agent options.
    #[must_use]
    pub const fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Returns the media type profiles as plain strings.
    #[must_use]
    pub fn accepted_profiles(&self) -> Vec<String> {
        self.options
            .media_type_profiles()
            .iter()
            .map(|profile| profile.as_str().to_owned())
            .collect()
    }

    /// Returns the transport return-route option of edge agents.
    #[must_use]
    pub fn return_route(&self) -> Option<&str> {
        self.return_route.as_deref()
    }

    /// Returns the configured DID resolver.
    #[must_use]
    pub const fn did_resolver(&self) -> Option<&Arc<dyn DidResolver>> {
        self.did_resolver.as_ref()
    }

    /// Returns the message registrar.
    #[must_use]
    pub const fn registrar(&self) -> Option<&Arc<MessageRegistrar>> {
        self.registrar.as_ref()
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &(dyn Clock + Send + Sync) {
        self.clock.as_ref()
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AgentContext")
            .field("agent_id", &self.agent_id)
            .field("bindings", &self.bindings)
            .field("options", &self.options)
            .field("return_route", &self.return_route)
            .finish_non_exhaustive()
    }
}
