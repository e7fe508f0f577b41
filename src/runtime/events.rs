//! Post-state and action event notification.
//!
//! Events are published on broadcast channels. A subscription only sees
//! events published after it was created, so callers must subscribe before
//! triggering the action whose outcome they wait for.

use crate::provisioning::domain::AgentId;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::Instant;

/// A protocol state transition that has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEvent {
    /// Agent that applied the transition.
    pub agent_id: AgentId,
    /// Protocol name, e.g. `didexchange`.
    pub protocol: String,
    /// New state name.
    pub state: String,
    /// Connection the transition belongs to.
    pub connection_id: String,
    /// Message thread of the transition.
    pub thread_id: String,
}

/// Kind of inbound message awaiting a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// An invitation was received and may be accepted.
    InvitationReceived,
    /// An exchange request was received and may be answered.
    RequestReceived,
}

impl ActionKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvitationReceived => "invitation_received",
            Self::RequestReceived => "request_received",
        }
    }
}

/// An inbound message awaiting `approve` or `reject`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    /// Agent holding the pending action.
    pub agent_id: AgentId,
    /// What the action is about.
    pub kind: ActionKind,
    /// Connection to approve or reject.
    pub connection_id: String,
}

/// Errors returned while waiting for events.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EventWaitError {
    /// The deadline passed first.
    #[error("timed out waiting for event")]
    Timeout,

    /// The agent stopped publishing events.
    #[error("event channel closed")]
    Closed,
}

/// Per-agent event fan-out.
#[derive(Debug, Clone)]
pub struct EventBus {
    states: broadcast::Sender<StateEvent>,
    actions: broadcast::Sender<ActionEvent>,
}

impl EventBus {
    /// Creates a bus whose channels buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (states, _) = broadcast::channel(capacity);
        let (actions, _) = broadcast::channel(capacity);
        Self { states, actions }
    }

    /// Publishes a state event.
    pub fn publish_state(&self, event: StateEvent) {
        tracing::debug!(
            agent_id = %event.agent_id,
            protocol = %event.protocol,
            state = %event.state,
            connection_id = %event.connection_id,
            "state transition"
        );
        // Without subscribers the event is dropped.
        let _receivers = self.states.send(event);
    }

    /// Publishes an action event.
    pub fn publish_action(&self, event: ActionEvent) {
        tracing::debug!(
            agent_id = %event.agent_id,
            kind = event.kind.as_str(),
            connection_id = %event.connection_id,
            "action pending"
        );
        let _receivers = self.actions.send(event);
    }

    /// Subscribes to state events, optionally only those entering `state`.
    #[must_use]
    pub fn subscribe_states(&self, state: Option<&str>) -> StateSubscription {
        StateSubscription {
            receiver: self.states.subscribe(),
            state: state.map(str::to_owned),
        }
    }

    /// Subscribes to action events.
    #[must_use]
    pub fn subscribe_actions(&self) -> ActionSubscription {
        ActionSubscription {
            receiver: self.actions.subscribe(),
        }
    }
}

/// A filtered stream of state events.
#[derive(Debug)]
pub struct StateSubscription {
    receiver: broadcast::Receiver<StateEvent>,
    state: Option<String>,
}

impl StateSubscription {
    fn matches(&self, event: &StateEvent) -> bool {
        self.state.as_deref().is_none_or(|state| state == event.state)
    }

    /// Waits for the next matching event until `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`EventWaitError::Timeout`] when the deadline passes and
    /// [`EventWaitError::Closed`] when the agent has shut down.
    pub async fn next_before(&mut self, deadline: Instant) -> Result<StateEvent, EventWaitError> {
        loop {
            let event = next_event(&mut self.receiver, deadline).await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns an already published matching event without waiting.
    pub fn try_next(&mut self) -> Option<StateEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

/// A stream of action events.
#[derive(Debug)]
pub struct ActionSubscription {
    receiver: broadcast::Receiver<ActionEvent>,
}

impl ActionSubscription {
    /// Waits for the next action until `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`EventWaitError::Timeout`] when the deadline passes and
    /// [`EventWaitError::Closed`] when the agent has shut down.
    pub async fn next_before(&mut self, deadline: Instant) -> Result<ActionEvent, EventWaitError> {
        next_event(&mut self.receiver, deadline).await
    }
}

async fn next_event<T: Clone>(
    receiver: &mut broadcast::Receiver<T>,
    deadline: Instant,
) -> Result<T, EventWaitError> {
    loop {
        match tokio::time::timeout_at(deadline, receiver.recv()).await {
            Err(_elapsed) => return Err(EventWaitError::Timeout),
            Ok(Ok(event)) => return Ok(event),
            Ok(Err(RecvError::Closed)) => return Err(EventWaitError::Closed),
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::warn!(skipped, "event subscriber lagged");
            }
        }
    }
}
