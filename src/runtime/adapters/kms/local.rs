//! Local key manager keeping Ed25519 secrets in the agent's own storage.

use crate::provisioning::domain::KeyType;
use crate::runtime::ports::{
    Crypto, KeyBackend, KeyHandle, KeyManager, KmsError, KmsResult, StorageProvider, StorageResult,
    Store, get_json, put_json,
};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ed25519_dalek::{Signer, SigningKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const KMS_NAMESPACE: &str = "kms";

#[derive(Serialize, Deserialize)]
struct StoredKey {
    key_type: KeyType,
    secret: String,
}

/// Key manager and crypto client backed by a local store.
pub struct LocalKms {
    store: Arc<dyn Store>,
}

impl LocalKms {
    /// Opens the key store inside `provider`.
    ///
    /// # Errors
    ///
    /// Returns storage errors when the namespace cannot be opened.
    pub fn open(provider: &dyn StorageProvider) -> StorageResult<Self> {
        Ok(Self {
            store: provider.open_store(KMS_NAMESPACE)?,
        })
    }

    /// Uses this key manager for both key creation and signing.
    #[must_use]
    pub fn into_key_backend(self) -> KeyBackend {
        let shared = Arc::new(self);
        KeyBackend::new(shared.clone(), shared)
    }

    fn signing_key(&self, kid: &str) -> KmsResult<SigningKey> {
        let stored: StoredKey = get_json(self.store.as_ref(), kid)?
            .ok_or_else(|| KmsError::KeyNotFound(kid.to_owned()))?;
        let secret = URL_SAFE_NO_PAD
            .decode(stored.secret)
            .map_err(|err| KmsError::InvalidKeyMaterial(err.to_string()))?;
        let seed: [u8; 32] = secret
            .try_into()
            .map_err(|_| KmsError::InvalidKeyMaterial(format!("stored key {kid} is not 32 bytes")))?;
        Ok(SigningKey::from_bytes(&seed))
    }
}

/// Derives a key identifier from public key bytes.
fn key_id_for(public_key: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(public_key))
}

#[async_trait]
impl KeyManager for LocalKms {
    async fn create(&self, key_type: KeyType) -> KmsResult<KeyHandle> {
        if key_type != KeyType::Ed25519 {
            return Err(KmsError::UnsupportedKeyType(key_type));
        }

        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();
        let kid = key_id_for(&public_key);
        put_json(
            self.store.as_ref(),
            &kid,
            &StoredKey {
                key_type,
                secret: URL_SAFE_NO_PAD.encode(signing_key.to_bytes()),
            },
        )?;
        Ok(KeyHandle::new(kid, key_type, public_key))
    }

    async fn export_public_key(&self, kid: &str) -> KmsResult<Vec<u8>> {
        Ok(self.signing_key(kid)?.verifying_key().to_bytes().to_vec())
    }
}

#[async_trait]
impl Crypto for LocalKms {
    async fn sign(&self, message: &[u8], kid: &str) -> KmsResult<Vec<u8>> {
        Ok(self.signing_key(kid)?.sign(message).to_bytes().to_vec())
    }
}
