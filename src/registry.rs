//! Agent lifecycle registry: running agents keyed by identity.
//!
//! The registry is an explicit value shared by reference with every
//! component that needs lookups. Registration is the only mutation; agents
//! stay registered until the registry itself is dropped.

use crate::provisioning::domain::AgentId;
use crate::runtime::{Agent, AgentContext, MessageRegistrar, Messenger};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors returned by [`AgentRegistry`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An agent is already registered under the identity.
    #[error("agent already registered: {0}")]
    DuplicateAgent(AgentId),

    /// No agent is registered under the identity.
    #[error("agent not found: {0}")]
    NotFound(String),

    /// The registry lock was poisoned.
    #[error("agent registry lock poisoned: {0}")]
    LockPoisoned(String),
}

/// A registered agent with its derived context and outbound messenger.
#[derive(Debug)]
pub struct RunningAgent {
    agent: Agent,
    context: AgentContext,
    messenger: Messenger,
    registrar: Option<Arc<MessageRegistrar>>,
}

impl RunningAgent {
    /// Wraps a started agent, capturing its context and messenger.
    ///
    /// # Errors
    ///
    /// Returns [`crate::runtime::AgentRuntimeError::ShutDown`] when the agent
    /// was already shut down.
    pub fn new(agent: Agent) -> Result<Self, crate::runtime::AgentRuntimeError> {
        let context = agent.context()?;
        let messenger = agent.messenger().clone();
        let registrar = context.registrar().cloned();
        Ok(Self {
            agent,
            context,
            messenger,
            registrar,
        })
    }

    /// Returns the agent identity.
    #[must_use]
    pub const fn id(&self) -> &AgentId {
        self.agent.agent_id()
    }

    /// Returns the running agent.
    #[must_use]
    pub const fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Returns the execution context captured at registration.
    #[must_use]
    pub const fn context(&self) -> &AgentContext {
        &self.context
    }

    /// Returns the outbound messenger.
    #[must_use]
    pub const fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Returns the message registrar, when the agent was created with one.
    #[must_use]
    pub const fn registrar(&self) -> Option<&Arc<MessageRegistrar>> {
        self.registrar.as_ref()
    }
}

/// Thread-safe table of running agents.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Arc<RunningAgent>>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `agent` under its identity.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAgent`] when the identity is taken;
    /// the existing entry is left untouched.
    pub fn register(&self, agent: RunningAgent) -> Result<Arc<RunningAgent>, RegistryError> {
        let mut agents = self
            .agents
            .write()
            .map_err(|err| RegistryError::LockPoisoned(err.to_string()))?;
        if agents.contains_key(agent.id()) {
            return Err(RegistryError::DuplicateAgent(agent.id().clone()));
        }

        let entry = Arc::new(agent);
        agents.insert(entry.id().clone(), Arc::clone(&entry));
        tracing::debug!(agent_id = %entry.id(), "agent registered");
        Ok(entry)
    }

    /// Looks up the agent registered under `agent_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown identities.
    pub fn lookup(&self, agent_id: &str) -> Result<Arc<RunningAgent>, RegistryError> {
        let not_found = || RegistryError::NotFound(agent_id.to_owned());
        let key = AgentId::new(agent_id).map_err(|_| not_found())?;
        let agents = self
            .agents
            .read()
            .map_err(|err| RegistryError::LockPoisoned(err.to_string()))?;
        agents.get(&key).cloned().ok_or_else(not_found)
    }

    /// Returns whether `agent_id` is registered.
    #[must_use]
    pub fn contains(&self, agent_id: &str) -> bool {
        self.lookup(agent_id).is_ok()
    }

    /// Returns the registered identities, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::LockPoisoned`] if the table is unusable.
    pub fn agent_ids(&self) -> Result<Vec<AgentId>, RegistryError> {
        let agents = self
            .agents
            .read()
            .map_err(|err| RegistryError::LockPoisoned(err.to_string()))?;
        let mut ids: Vec<AgentId> = agents.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
