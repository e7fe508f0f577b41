//! Minimal DID documents for peer DIDs exchanged during connection setup.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// JSON-LD context of DID documents.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Verification method type for Ed25519 keys.
pub const ED25519_VERIFICATION_KEY: &str = "Ed25519VerificationKey2020";

/// Service type advertising a DIDComm endpoint.
pub const DIDCOMM_SERVICE_TYPE: &str = "DIDCommMessaging";

/// Errors raised while interpreting DID documents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DidDocumentError {
    /// The document carries no Ed25519 verification method.
    #[error("DID document {0} has no Ed25519 verification method")]
    MissingSigningKey(String),

    /// A verification method carries undecodable key material.
    #[error("verification method {0} has malformed key material")]
    MalformedKey(String),
}

/// An Ed25519 public key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyJwk {
    /// Key type, always `OKP`.
    pub kty: String,
    /// Curve, always `Ed25519`.
    pub crv: String,
    /// Base64url encoded public key.
    pub x: String,
}

/// A verification method entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Method identifier (`{did}#key-1`).
    pub id: String,
    /// Method type.
    #[serde(rename = "type")]
    pub method_type: String,
    /// DID controlling the key.
    pub controller: String,
    /// Public key material.
    pub public_key_jwk: PublicKeyJwk,
}

/// A service entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidService {
    /// Service identifier.
    pub id: String,
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint URL.
    pub service_endpoint: String,
    /// Accepted media type profiles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accept: Vec<String>,
}

/// A DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// JSON-LD contexts.
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,
    /// The DID.
    pub id: String,
    /// Verification methods.
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    /// Service endpoints.
    #[serde(default)]
    pub service: Vec<DidService>,
}

impl DidDocument {
    /// Builds a peer DID document for an Ed25519 key.
    ///
    /// The DID is derived from the key, so the same key always yields the
    /// same DID. Edge agents pass no endpoint and get no service entry.
    #[must_use]
    pub fn peer(public_key: &[u8], endpoint: Option<&str>, accept: &[String]) -> Self {
        let did = format!(
            "did:peer:{}",
            URL_SAFE_NO_PAD.encode(Sha256::digest(public_key))
        );
        let verification_method = VerificationMethod {
            id: format!("{did}#key-1"),
            method_type: ED25519_VERIFICATION_KEY.to_owned(),
            controller: did.clone(),
            public_key_jwk: PublicKeyJwk {
                kty: "OKP".to_owned(),
                crv: "Ed25519".to_owned(),
                x: URL_SAFE_NO_PAD.encode(public_key),
            },
        };
        let service = endpoint
            .map(|url| DidService {
                id: format!("{did}#didcomm"),
                service_type: DIDCOMM_SERVICE_TYPE.to_owned(),
                service_endpoint: url.to_owned(),
                accept: accept.to_vec(),
            })
            .into_iter()
            .collect();

        Self {
            context: vec![DID_CONTEXT.to_owned()],
            id: did,
            verification_method: vec![verification_method],
            service,
        }
    }

    /// Returns the first DIDComm service endpoint, if any.
    #[must_use]
    pub fn service_endpoint(&self) -> Option<&str> {
        self.service
            .iter()
            .find(|service| service.service_type == DIDCOMM_SERVICE_TYPE)
            .map(|service| service.service_endpoint.as_str())
    }

    /// Returns the first Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns [`DidDocumentError::MissingSigningKey`] when no Ed25519 method
    /// exists and [`DidDocumentError::MalformedKey`] when it cannot be
    /// decoded.
    pub fn signing_key(&self) -> Result<Vec<u8>, DidDocumentError> {
        let method = self
            .verification_method
            .iter()
            .find(|method| method.public_key_jwk.crv == "Ed25519")
            .ok_or_else(|| DidDocumentError::MissingSigningKey(self.id.clone()))?;
        URL_SAFE_NO_PAD
            .decode(&method.public_key_jwk.x)
            .map_err(|_| DidDocumentError::MalformedKey(method.id.clone()))
    }
}

/// Returns the method segment of `did:<method>:<id>`, if well formed.
#[must_use]
pub fn did_method(did: &str) -> Option<&str> {
    let mut parts = did.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => {
            Some(method)
        }
        _ => None,
    }
}
