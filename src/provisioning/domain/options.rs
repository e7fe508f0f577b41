//! Per-agent protocol options: key types and media type profiles.

use super::{ParseKeyTypeError, ProvisioningDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key types an agent may be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Ed25519 signing key.
    #[serde(rename = "ED25519")]
    Ed25519,
    /// ECDSA P-256 signing key with IEEE P1363 signatures.
    #[serde(rename = "ECDSAP256IEEEP1363")]
    EcdsaP256Ieee,
    /// ECDSA P-384 signing key with IEEE P1363 signatures.
    #[serde(rename = "ECDSAP384IEEEP1363")]
    EcdsaP384Ieee,
    /// BLS12-381 G2 signing key.
    #[serde(rename = "BLS12381G2")]
    Bls12381G2,
    /// X25519 key-agreement key.
    #[serde(rename = "X25519ECDHKW")]
    X25519EcdhKw,
    /// NIST P-256 key-agreement key.
    #[serde(rename = "NISTP256ECDHKW")]
    NistP256EcdhKw,
    /// NIST P-384 key-agreement key.
    #[serde(rename = "NISTP384ECDHKW")]
    NistP384EcdhKw,
}

impl KeyType {
    /// Returns the canonical key type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ed25519 => "ED25519",
            Self::EcdsaP256Ieee => "ECDSAP256IEEEP1363",
            Self::EcdsaP384Ieee => "ECDSAP384IEEEP1363",
            Self::Bls12381G2 => "BLS12381G2",
            Self::X25519EcdhKw => "X25519ECDHKW",
            Self::NistP256EcdhKw => "NISTP256ECDHKW",
            Self::NistP384EcdhKw => "NISTP384ECDHKW",
        }
    }

    /// Returns whether this is a key-agreement (rather than signing) type.
    #[must_use]
    pub const fn is_key_agreement(self) -> bool {
        matches!(
            self,
            Self::X25519EcdhKw | Self::NistP256EcdhKw | Self::NistP384EcdhKw
        )
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for KeyType {
    type Error = ParseKeyTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ED25519" => Ok(Self::Ed25519),
            "ECDSAP256IEEEP1363" => Ok(Self::EcdsaP256Ieee),
            "ECDSAP384IEEEP1363" => Ok(Self::EcdsaP384Ieee),
            "BLS12381G2" => Ok(Self::Bls12381G2),
            "X25519ECDHKW" => Ok(Self::X25519EcdhKw),
            "NISTP256ECDHKW" => Ok(Self::NistP256EcdhKw),
            "NISTP384ECDHKW" => Ok(Self::NistP384EcdhKw),
            _ => Err(ParseKeyTypeError(value.trim().to_owned())),
        }
    }
}

/// Messaging protocol version selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolVersion {
    /// DIDComm v1 envelopes (AIP 1 / AIP 2 RFC 0019).
    V1,
    /// DIDComm v2 envelopes.
    V2,
}

impl ProtocolVersion {
    /// Returns the envelope content type used on the wire.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::V1 => "application/didcomm-envelope-enc",
            Self::V2 => "application/didcomm-encrypted+json",
        }
    }
}

/// A media type profile string such as `didcomm/v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTypeProfile(String);

impl MediaTypeProfile {
    /// Aries Interop Profile 1.
    pub const AIP1: &'static str = "didcomm/aip1";
    /// Aries Interop Profile 2 with RFC 0019 envelopes.
    pub const AIP2_RFC19: &'static str = "didcomm/aip2;env=rfc19";
    /// Aries Interop Profile 2 with RFC 0587 (DIDComm v2) envelopes.
    pub const AIP2_RFC587: &'static str = "didcomm/aip2;env=rfc587";
    /// DIDComm v2.
    pub const DIDCOMM_V2: &'static str = "didcomm/v2";

    /// Creates a validated profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError::EmptyMediaTypeProfile`] when the
    /// value is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, ProvisioningDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ProvisioningDomainError::EmptyMediaTypeProfile);
        }
        Ok(Self(normalized))
    }

    /// Parses a comma-separated profile list.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ProvisioningDomainError> {
        value.split(',').map(Self::new).collect()
    }

    /// Returns the profile string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the profile selects DIDComm v2 envelopes.
    #[must_use]
    pub fn is_v2(&self) -> bool {
        matches!(self.as_str(), Self::DIDCOMM_V2 | Self::AIP2_RFC587)
    }

    fn known(value: &'static str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for MediaTypeProfile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Key and messaging options applied to a new agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOptions {
    key_type: KeyType,
    key_agreement_type: KeyType,
    media_type_profiles: Vec<MediaTypeProfile>,
}

impl AgentOptions {
    /// Creates the default options for a protocol version.
    #[must_use]
    pub fn for_version(version: ProtocolVersion) -> Self {
        let media_type_profiles = match version {
            ProtocolVersion::V1 => vec![
                MediaTypeProfile::known(MediaTypeProfile::AIP1),
                MediaTypeProfile::known(MediaTypeProfile::AIP2_RFC19),
            ],
            ProtocolVersion::V2 => vec![MediaTypeProfile::known(MediaTypeProfile::DIDCOMM_V2)],
        };

        Self {
            key_type: KeyType::Ed25519,
            key_agreement_type: KeyType::X25519EcdhKw,
            media_type_profiles,
        }
    }

    /// Sets the signing key type.
    #[must_use]
    pub const fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Sets the key-agreement key type.
    #[must_use]
    pub const fn with_key_agreement_type(mut self, key_type: KeyType) -> Self {
        self.key_agreement_type = key_type;
        self
    }

    /// Replaces the media type profiles. An empty list keeps the current ones.
    #[must_use]
    pub fn with_media_type_profiles(
        mut self,
        profiles: impl IntoIterator<Item = MediaTypeProfile>,
    ) -> Self {
        let collected: Vec<MediaTypeProfile> = profiles.into_iter().collect();
        if !collected.is_empty() {
            self.media_type_profiles = collected;
        }
        self
    }

    /// Returns the signing key type.
    #[must_use]
    pub const fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the key-agreement key type.
    #[must_use]
    pub const fn key_agreement_type(&self) -> KeyType {
        self.key_agreement_type
    }

    /// Returns the media type profiles in preference order.
    #[must_use]
    pub fn media_type_profiles(&self) -> &[MediaTypeProfile] {
        &self.media_type_profiles
    }

    /// Returns the protocol version implied by the preferred profile.
    #[must_use]
    pub fn protocol_version(&self) -> ProtocolVersion {
        match self.media_type_profiles.first() {
            Some(profile) if profile.is_v2() => ProtocolVersion::V2,
            _ => ProtocolVersion::V1,
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::for_version(ProtocolVersion::V1)
    }
}
