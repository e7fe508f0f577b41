//! Stages of one orchestrated handshake.

use serde::Serialize;
use std::fmt;

/// Progress of a handshake between an inviter and an invitee.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStage {
    /// Nothing has happened yet.
    #[default]
    NotStarted,
    /// The inviter created an invitation.
    Invited,
    /// The invitee recorded the invitation.
    Received,
    /// The invitee sent its exchange request.
    Requested,
    /// The inviter sent its response.
    Responded,
    /// Both agents reached `completed`.
    Completed,
}

impl HandshakeStage {
    /// Returns the stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Invited => "invited",
            Self::Received => "received",
            Self::Requested => "requested",
            Self::Responded => "responded",
            Self::Completed => "completed",
        }
    }

    /// Returns the stage that follows, or `None` once completed.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Invited),
            Self::Invited => Some(Self::Received),
            Self::Received => Some(Self::Requested),
            Self::Requested => Some(Self::Responded),
            Self::Responded => Some(Self::Completed),
            Self::Completed => None,
        }
    }
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
