//! Agent runtime errors.

use crate::provisioning::domain::AgentId;
use crate::runtime::ports::{StorageError, TransportError};
use thiserror::Error;

/// Errors returned while starting or using an agent runtime.
#[derive(Debug, Clone, Error)]
pub enum AgentRuntimeError {
    /// An inbound listener could not bind its resolved address.
    #[error("listener bind failed on {address}: {source}")]
    ListenerBindFailed {
        /// The `host:port` that could not be bound.
        address: String,
        /// Underlying transport error.
        source: TransportError,
    },

    /// Protocol service storage could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The agent has been shut down.
    #[error("agent {0} has been shut down")]
    ShutDown(AgentId),
}
