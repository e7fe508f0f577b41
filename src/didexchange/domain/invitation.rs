//! Out-of-band invitation.

use super::{DidExchangeDomainError, INVITATION_TYPE};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An invitation to connect.
///
/// Either carries the inviter's key and endpoint inline or names a public
/// DID that the invitee resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    message_type: String,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    did: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    recipient_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    accept: Vec<String>,
}

impl Invitation {
    /// Creates an invitation carrying `recipient_key` and `endpoint` inline.
    #[must_use]
    pub fn inline(label: &str, recipient_key: &[u8], endpoint: &str, accept: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: INVITATION_TYPE.to_owned(),
            label: label.to_owned(),
            did: None,
            recipient_keys: vec![URL_SAFE_NO_PAD.encode(recipient_key)],
            service_endpoint: Some(endpoint.to_owned()),
            accept,
        }
    }

    /// Creates an invitation naming a resolvable public DID.
    #[must_use]
    pub fn public(label: &str, did: &str, accept: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: INVITATION_TYPE.to_owned(),
            label: label.to_owned(),
            did: Some(did.to_owned()),
            recipient_keys: Vec::new(),
            service_endpoint: None,
            accept,
        }
    }

    /// Returns the invitation identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the inviter label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the public DID, if any.
    #[must_use]
    pub fn did(&self) -> Option<&str> {
        self.did.as_deref()
    }

    /// Returns the inline endpoint, if any.
    #[must_use]
    pub fn service_endpoint(&self) -> Option<&str> {
        self.service_endpoint.as_deref()
    }

    /// Returns the accepted media type profiles.
    #[must_use]
    pub fn accept(&self) -> &[String] {
        &self.accept
    }

    /// Decodes the first inline recipient key.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::MalformedEncoding`] when the key is
    /// not base64url.
    pub fn recipient_key(&self) -> Result<Option<Vec<u8>>, DidExchangeDomainError> {
        self.recipient_keys
            .first()
            .map(|key| {
                URL_SAFE_NO_PAD
                    .decode(key)
                    .map_err(|_| DidExchangeDomainError::MalformedEncoding("recipientKeys"))
            })
            .transpose()
    }

    /// Checks that the invitation can be acted on.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::IncompleteInvitation`] when it has
    /// neither an inline key with endpoint nor a public DID.
    pub fn validate(&self) -> Result<(), DidExchangeDomainError> {
        let has_inline = !self.recipient_keys.is_empty() && self.service_endpoint.is_some();
        if has_inline || self.did.is_some() {
            Ok(())
        } else {
            Err(DidExchangeDomainError::IncompleteInvitation(self.id.clone()))
        }
    }
}
