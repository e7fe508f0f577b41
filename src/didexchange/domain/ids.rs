//! Connection identifier.

use super::DidExchangeDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a connection record, local to one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::InvalidConnectionId`] when `value`
    /// is not a UUID.
    pub fn parse(value: &str) -> Result<Self, DidExchangeDomainError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| DidExchangeDomainError::InvalidConnectionId(value.to_owned()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
