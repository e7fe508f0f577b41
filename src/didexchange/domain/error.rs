//! Error types for DID exchange domain values.

use super::{ConnectionId, ConnectionState};
use thiserror::Error;

/// Errors returned while manipulating DID exchange domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DidExchangeDomainError {
    /// The connection identifier is not a UUID.
    #[error("invalid connection id: {0}")]
    InvalidConnectionId(String),

    /// The requested state change is not allowed.
    #[error("connection {connection_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Connection being updated.
        connection_id: ConnectionId,
        /// Current state.
        from: ConnectionState,
        /// Requested state.
        to: ConnectionState,
    },

    /// An invitation names neither inline keys nor a public DID.
    #[error("invitation {0} has neither a recipient key nor a public DID")]
    IncompleteInvitation(String),

    /// Base64url data could not be decoded.
    #[error("malformed base64url in {0}")]
    MalformedEncoding(&'static str),

    /// A signed attachment failed verification.
    #[error("signed attachment does not verify against the invitation key")]
    BadSignature,

    /// The attached DID document does not match the DID in the message.
    #[error("attached DID document {attached} does not match {expected}")]
    DidMismatch {
        /// DID claimed by the message.
        expected: String,
        /// DID of the attached document.
        attached: String,
    },
}

/// Error returned while parsing connection states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown connection state: {0}")]
pub struct ParseConnectionStateError(pub String);
