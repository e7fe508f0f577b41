//! Minimal DIDComm agent runtime.
//!
//! An [`Agent`] is started from an immutable [`AgentConfiguration`]. It binds
//! its inbound listeners, runs an inbound dispatcher on its own task and
//! publishes protocol state changes on an [`EventBus`] that callers
//! subscribe to.

pub mod adapters;
mod agent;
mod configuration;
mod context;
pub mod did;
mod dispatcher;
mod envelope;
mod error;
mod events;
mod messenger;
pub mod ports;
mod registrar;
#[cfg(test)]
pub(crate) mod test_agents;

pub use agent::Agent;
pub use configuration::{AgentConfiguration, AgentConfigurationBuilder};
pub use context::AgentContext;
pub use envelope::Envelope;
pub use error::AgentRuntimeError;
pub use events::{
    ActionEvent, ActionKind, ActionSubscription, EventBus, EventWaitError, StateEvent,
    StateSubscription,
};
pub use messenger::{Messenger, MessengerError};
pub use registrar::{MessageRegistrar, MessageService, MessageServiceError, RegistrarError};
