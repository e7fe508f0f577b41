//! Key management and signing ports.

use super::StorageError;
use crate::provisioning::domain::KeyType;
use async_trait::async_trait;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use std::sync::Arc;
use thiserror::Error;

/// Result type for key-management operations.
pub type KmsResult<T> = Result<T, KmsError>;

/// Reference to a key held by a key manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    kid: String,
    key_type: KeyType,
    public_key: Vec<u8>,
}

impl KeyHandle {
    /// Creates a key handle.
    #[must_use]
    pub const fn new(kid: String, key_type: KeyType, public_key: Vec<u8>) -> Self {
        Self {
            kid,
            key_type,
            public_key,
        }
    }

    /// Returns the key identifier.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Returns the key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Creates and exports keys.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Creates a new key of `key_type`.
    async fn create(&self, key_type: KeyType) -> KmsResult<KeyHandle>;

    /// Exports the public key bytes for `kid`.
    async fn export_public_key(&self, kid: &str) -> KmsResult<Vec<u8>>;
}

/// Signs with managed keys and verifies peer signatures.
#[async_trait]
pub trait Crypto: Send + Sync {
    /// Signs `message` with the key identified by `kid`.
    async fn sign(&self, message: &[u8], kid: &str) -> KmsResult<Vec<u8>>;

    /// Verifies an Ed25519 `signature` over `message` for `public_key`.
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::InvalidKeyMaterial`] for malformed input and
    /// [`KmsError::InvalidSignature`] when verification fails.
    fn verify(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> KmsResult<()> {
        verify_ed25519(signature, message, public_key)
    }
}

/// A key manager paired with the crypto client that signs with its keys.
///
/// Chosen once when the agent configuration is built.
#[derive(Clone)]
pub struct KeyBackend {
    manager: Arc<dyn KeyManager>,
    crypto: Arc<dyn Crypto>,
}

impl KeyBackend {
    /// Pairs a key manager with its crypto client.
    #[must_use]
    pub fn new(manager: Arc<dyn KeyManager>, crypto: Arc<dyn Crypto>) -> Self {
        Self { manager, crypto }
    }

    /// Returns the key manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<dyn KeyManager> {
        &self.manager
    }

    /// Returns the crypto client.
    #[must_use]
    pub fn crypto(&self) -> &Arc<dyn Crypto> {
        &self.crypto
    }
}

impl std::fmt::Debug for KeyBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("KeyBackend").finish_non_exhaustive()
    }
}

/// Verifies an Ed25519 signature.
///
/// # Errors
///
/// Returns [`KmsError::InvalidKeyMaterial`] when the key or signature have the
/// wrong length and [`KmsError::InvalidSignature`] when verification fails.
pub fn verify_ed25519(signature: &[u8], message: &[u8], public_key: &[u8]) -> KmsResult<()> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| KmsError::InvalidKeyMaterial("ed25519 public key must be 32 bytes".to_owned()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|err| KmsError::InvalidKeyMaterial(err.to_string()))?;
    let parsed = Signature::from_slice(signature)
        .map_err(|err| KmsError::InvalidKeyMaterial(err.to_string()))?;
    verifying_key
        .verify(message, &parsed)
        .map_err(|_| KmsError::InvalidSignature)
}

/// Errors returned by key-management adapters.
#[derive(Debug, Clone, Error)]
pub enum KmsError {
    /// The backend cannot create keys of this type.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(KeyType),

    /// No key exists with this identifier.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Key or signature bytes are malformed.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A signature did not verify.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Local key storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The remote key server answered with an error status.
    #[error("key server at {url} returned status {status}")]
    RemoteStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The remote key server answered without a required field or header.
    #[error("key server at {url} returned an incomplete response: {reason}")]
    RemoteProtocol {
        /// Request URL.
        url: String,
        /// What was missing or malformed.
        reason: String,
    },

    /// The remote key server could not be reached or the TLS setup failed.
    #[error("key server transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl KmsError {
    /// Wraps a transport failure.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
