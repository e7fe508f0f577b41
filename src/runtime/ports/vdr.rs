//! DID resolution port.

use crate::runtime::did::DidDocument;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for DID resolution.
pub type VdrResult<T> = Result<T, VdrError>;

/// Resolves DIDs to documents.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Returns whether this resolver handles DIDs of `method`.
    fn accepts(&self, method: &str) -> bool;

    /// Resolves `did` to its document.
    async fn resolve(&self, did: &str) -> VdrResult<DidDocument>;
}

/// Errors returned by DID resolvers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VdrError {
    /// The DID is not of the form `did:<method>:<id>`.
    #[error("malformed DID: {0}")]
    MalformedDid(String),

    /// No resolver accepts this DID method.
    #[error("DID method '{0}' is not supported")]
    UnsupportedMethod(String),

    /// The DID does not exist.
    #[error("DID not found: {0}")]
    NotFound(String),

    /// Resolution failed.
    #[error("DID resolution failed for {did}: {reason}")]
    Resolution {
        /// DID being resolved.
        did: String,
        /// Failure description.
        reason: String,
    },
}
