//! Connection states and roles.

use super::ParseConnectionStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the exchange an agent plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Created the invitation and answers the request.
    Inviter,
    /// Received the invitation and sends the request.
    Invitee,
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Invitation received, request not yet sent.
    Invited,
    /// Request sent or received.
    Requested,
    /// Response sent or received.
    Responded,
    /// Exchange finished; terminal.
    Completed,
    /// Exchange rejected or failed; terminal.
    Abandoned,
}

impl ConnectionState {
    /// Returns the canonical state name used in events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "invited",
            Self::Requested => "requested",
            Self::Responded => "responded",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    /// Returns whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Returns whether moving to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Invited, Self::Requested)
                | (Self::Requested, Self::Responded)
                | (Self::Responded, Self::Completed)
                | (Self::Invited | Self::Requested | Self::Responded, Self::Abandoned)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ConnectionState {
    type Error = ParseConnectionStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "invited" => Ok(Self::Invited),
            "requested" => Ok(Self::Requested),
            "responded" => Ok(Self::Responded),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(ParseConnectionStateError(value.to_owned())),
        }
    }
}
