//! Connection establishment between two registered agents.

use super::stage::HandshakeStage;
use crate::config::HarnessConfig;
use crate::didexchange::DidExchangeError;
use crate::didexchange::domain::{ConnectionId, ConnectionState};
use crate::provisioning::domain::{AgentId, AgentOptions, InboundRequest, ProtocolVersion};
use crate::provisioning::services::{AgentLifecycleService, CreateAgentRequest, ProvisioningError};
use crate::registry::{AgentRegistry, RegistryError, RunningAgent};
use crate::runtime::{
    ActionKind, ActionSubscription, EventWaitError, StateEvent, StateSubscription,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Errors returned while establishing a connection.
#[derive(Debug, Clone, Error)]
pub enum HandshakeError {
    /// A participant is not registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A participant could not be provisioned.
    #[error(transparent)]
    Provisioning(Box<ProvisioningError>),

    /// An awaited event did not arrive in time.
    #[error("agent {agent_id} did not reach {stage} within {timeout:?}")]
    Timeout {
        /// Agent whose event was awaited.
        agent_id: AgentId,
        /// Stage the handshake was waiting to reach.
        stage: HandshakeStage,
        /// Per-event deadline.
        timeout: Duration,
    },

    /// An agent stopped publishing events mid-handshake.
    #[error("agent {agent_id} stopped publishing events before {stage}")]
    EventsClosed {
        /// Agent whose channel closed.
        agent_id: AgentId,
        /// Stage the handshake was waiting to reach.
        stage: HandshakeStage,
    },

    /// A DID exchange verb failed.
    #[error("agent {agent_id} failed to reach {stage}: {source}")]
    DidExchange {
        /// Agent whose verb failed.
        agent_id: AgentId,
        /// Stage the verb was meant to reach.
        stage: HandshakeStage,
        /// Protocol failure.
        source: DidExchangeError,
    },
}

/// A completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOutcome {
    /// Agent that created the invitation.
    pub inviter: AgentId,
    /// Agent that accepted it.
    pub invitee: AgentId,
    /// The inviter's connection record.
    pub inviter_connection: ConnectionId,
    /// The invitee's connection record.
    pub invitee_connection: ConnectionId,
    /// Thread shared by both records.
    pub thread_id: String,
}

/// Per-participant subscriptions, created before the invitation exists.
struct Participant {
    entry: Arc<RunningAgent>,
    actions: ActionSubscription,
    completed: StateSubscription,
}

impl Participant {
    fn subscribe(entry: Arc<RunningAgent>) -> Self {
        let agent = entry.agent();
        let actions = agent.subscribe_actions();
        let completed = agent.register_post_state_event(ConnectionState::Completed.as_str());
        Self {
            entry,
            actions,
            completed,
        }
    }

    fn id(&self) -> &AgentId {
        self.entry.id()
    }
}

/// Drives the DID exchange between two agents of one [`AgentRegistry`].
#[derive(Debug, Clone)]
pub struct ConnectionOrchestrator {
    registry: Arc<AgentRegistry>,
    timeout: Duration,
}

impl ConnectionOrchestrator {
    /// Creates an orchestrator waiting at most `timeout` for each event.
    #[must_use]
    pub const fn new(registry: Arc<AgentRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Creates an orchestrator using the configured handshake timeout.
    #[must_use]
    pub fn from_config(registry: Arc<AgentRegistry>, config: &HarnessConfig) -> Self {
        Self::new(registry, config.handshake_timeout())
    }

    /// Connects `inviter` and `invitee`, both already registered.
    ///
    /// Both agents are subscribed before the invitation is created. The
    /// invitee's invitation action and the inviter's request action are
    /// approved as they arrive; the call returns once both agents have
    /// published `completed` for the new connection.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::Registry`] for unknown agents,
    /// [`HandshakeError::Timeout`] when an event misses its deadline and
    /// [`HandshakeError::DidExchange`] when a protocol verb fails.
    pub async fn establish(
        &self,
        inviter: &str,
        invitee: &str,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        let mut inviter = Participant::subscribe(self.registry.lookup(inviter)?);
        let mut invitee = Participant::subscribe(self.registry.lookup(invitee)?);
        tracing::info!(inviter = %inviter.id(), invitee = %invitee.id(), "handshake started");
        let mut progress = Progress::default();

        let invitation = inviter
            .entry
            .agent()
            .didexchange()
            .create_invitation(None)
            .await
            .map_err(|source| protocol_failure(inviter.id(), progress.pending(), source))?;
        progress.advance(&inviter, &invitee);

        let invitee_connection = invitee
            .entry
            .agent()
            .didexchange()
            .receive_invitation(&invitation)
            .await
            .map_err(|source| protocol_failure(invitee.id(), progress.pending(), source))?;
        progress.advance(&inviter, &invitee);

        self.approve_next(&mut invitee, ActionKind::InvitationReceived, progress.pending())
            .await?;
        progress.advance(&inviter, &invitee);

        let inviter_connection = self
            .approve_next(&mut inviter, ActionKind::RequestReceived, progress.pending())
            .await?;
        progress.advance(&inviter, &invitee);

        let inviter_done = self.wait_completed(&mut inviter, inviter_connection).await?;
        self.wait_completed(&mut invitee, invitee_connection).await?;
        progress.advance(&inviter, &invitee);

        Ok(HandshakeOutcome {
            inviter: inviter.id().clone(),
            invitee: invitee.id().clone(),
            inviter_connection,
            invitee_connection,
            thread_id: inviter_done.thread_id,
        })
    }

    /// Provisions two DIDComm v2 agents on random local HTTP ports and
    /// connects them.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::Provisioning`] when either agent cannot be
    /// created, in which case no handshake is attempted, and the
    /// [`Self::establish`] errors otherwise.
    pub async fn establish_with_new_agents(
        &self,
        lifecycle: &AgentLifecycleService,
        inviter: &str,
        invitee: &str,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        for agent_id in [inviter, invitee] {
            let inbound = InboundRequest::single_random("http", "localhost").map_err(|source| {
                provisioning_failure(ProvisioningError::InvalidRequest {
                    agent_id: agent_id.to_owned(),
                    source,
                })
            })?;
            let request = CreateAgentRequest::new(agent_id, inbound)
                .with_options(AgentOptions::for_version(ProtocolVersion::V2));
            lifecycle
                .create_agent(request)
                .await
                .map_err(provisioning_failure)?;
        }
        self.establish(inviter, invitee).await
    }

    /// Waits for the next `kind` action and approves it.
    async fn approve_next(
        &self,
        participant: &mut Participant,
        kind: ActionKind,
        stage: HandshakeStage,
    ) -> Result<ConnectionId, HandshakeError> {
        let deadline = Instant::now() + self.timeout;
        let connection_id = loop {
            let event = participant
                .actions
                .next_before(deadline)
                .await
                .map_err(|err| self.wait_failure(participant.id(), stage, err))?;
            if event.kind == kind {
                break ConnectionId::parse(&event.connection_id).map_err(|err| {
                    protocol_failure(participant.id(), stage, DidExchangeError::from(err))
                })?;
            }
        };

        participant
            .entry
            .agent()
            .didexchange()
            .approve(connection_id)
            .await
            .map_err(|source| protocol_failure(participant.id(), stage, source))?;
        Ok(connection_id)
    }

    async fn wait_completed(
        &self,
        participant: &mut Participant,
        connection_id: ConnectionId,
    ) -> Result<StateEvent, HandshakeError> {
        let deadline = Instant::now() + self.timeout;
        let expected = connection_id.to_string();
        loop {
            let event = participant
                .completed
                .next_before(deadline)
                .await
                .map_err(|err| self.wait_failure(participant.id(), HandshakeStage::Completed, err))?;
            if event.connection_id == expected {
                return Ok(event);
            }
        }
    }

    fn wait_failure(
        &self,
        agent_id: &AgentId,
        stage: HandshakeStage,
        err: EventWaitError,
    ) -> HandshakeError {
        let agent_id = agent_id.clone();
        tracing::warn!(agent_id = %agent_id, stage = %stage, error = %err, "handshake stalled");
        match err {
            EventWaitError::Timeout => HandshakeError::Timeout {
                agent_id,
                stage,
                timeout: self.timeout,
            },
            EventWaitError::Closed => HandshakeError::EventsClosed { agent_id, stage },
        }
    }
}

fn protocol_failure(
    agent_id: &AgentId,
    stage: HandshakeStage,
    source: DidExchangeError,
) -> HandshakeError {
    HandshakeError::DidExchange {
        agent_id: agent_id.clone(),
        stage,
        source,
    }
}

fn provisioning_failure(err: ProvisioningError) -> HandshakeError {
    HandshakeError::Provisioning(Box::new(err))
}

/// Last stage one handshake reached.
#[derive(Debug, Default)]
struct Progress {
    reached: HandshakeStage,
}

impl Progress {
    /// Returns the stage being worked towards, which is `Completed` once
    /// the handshake has finished.
    const fn pending(&self) -> HandshakeStage {
        match self.reached.next() {
            Some(stage) => stage,
            None => self.reached,
        }
    }

    const fn step(&mut self) -> HandshakeStage {
        self.reached = self.pending();
        self.reached
    }

    fn advance(&mut self, inviter: &Participant, invitee: &Participant) {
        let stage = self.step();
        tracing::debug!(
            inviter = %inviter.id(),
            invitee = %invitee.id(),
            stage = %stage,
            "handshake advanced"
        );
    }
}
