//! Connection establishment between two provisioned agents.
//!
//! The orchestrator subscribes to both agents' events before creating the
//! invitation, approves each peer-initiated step as its action event
//! arrives, and bounds every wait with the configured handshake timeout.

mod orchestrator;
mod stage;

pub use orchestrator::{ConnectionOrchestrator, HandshakeError, HandshakeOutcome};
pub use stage::HandshakeStage;
