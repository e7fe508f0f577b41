//! Agent identity type.

use super::ProvisioningDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Caller-chosen key that uniquely identifies one running agent.
///
/// Identities are opaque apart from two rules: they are non-empty and they
/// contain neither commas nor whitespace, so lists of identities can be
/// written as `"Alice,Bob"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a validated agent identity.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError`] when the value is empty or contains
    /// a comma or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ProvisioningDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(ProvisioningDomainError::EmptyAgentId);
        }

        let is_valid = !normalized
            .chars()
            .any(|character| character == ',' || character.is_whitespace());
        if !is_valid {
            return Err(ProvisioningDomainError::InvalidAgentId(normalized));
        }

        Ok(Self(normalized))
    }

    /// Creates an identity from `prefix` with a fresh random suffix.
    ///
    /// Concurrent provisioning calls must not share an identity; suffixing
    /// keeps parallel scenarios apart.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError`] when `prefix` is not a valid
    /// identity.
    pub fn with_random_suffix(prefix: &str) -> Result<Self, ProvisioningDomainError> {
        let suffix = Uuid::new_v4().simple().to_string();
        Self::new(format!("{}-{suffix}", prefix.trim()))
    }

    /// Parses a comma-separated identity list.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, ProvisioningDomainError> {
        value.split(',').map(Self::new).collect()
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AgentId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
