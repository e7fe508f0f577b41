//! DID exchange message types and bodies.

use super::DidExchangeDomainError;
use crate::runtime::did::DidDocument;
use crate::runtime::ports::verify_ed25519;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// Common prefix of DID exchange message types.
pub const DIDEXCHANGE_PREFIX: &str = "https://didcomm.org/didexchange/1.0/";
/// Invitation message type.
pub const INVITATION_TYPE: &str = "https://didcomm.org/didexchange/1.0/invitation";
/// Request message type.
pub const REQUEST_TYPE: &str = "https://didcomm.org/didexchange/1.0/request";
/// Response message type.
pub const RESPONSE_TYPE: &str = "https://didcomm.org/didexchange/1.0/response";
/// Completion message type.
pub const COMPLETE_TYPE: &str = "https://didcomm.org/didexchange/1.0/complete";
/// Problem report message type.
pub const PROBLEM_REPORT_TYPE: &str = "https://didcomm.org/didexchange/1.0/problem_report";

/// Body of an exchange request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Invitee label.
    pub label: String,
    /// Invitee DID.
    pub did: String,
    /// Invitee DID document.
    pub did_doc: DidDocument,
}

/// Body of an exchange response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Inviter DID.
    pub did: String,
    /// Inviter DID document signed with the invitation key.
    pub did_doc_attach: SignedAttachment,
}

/// Body of the completion message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteBody {}

/// Body of a problem report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReportBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable explanation.
    pub explain: String,
}

/// A DID document signed by the key the invitation advertised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttachment {
    /// Base64url encoded JSON document; the signature covers these bytes.
    pub data: String,
    /// Base64url encoded Ed25519 signature.
    pub signature: String,
}

impl SignedAttachment {
    /// Encodes `document` as attachment data.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when encoding fails.
    pub fn encode_document(document: &DidDocument) -> Result<String, serde_json::Error> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(document)?))
    }

    /// Wraps encoded `data` and its raw `signature`.
    #[must_use]
    pub fn new(data: String, signature: &[u8]) -> Self {
        Self {
            data,
            signature: URL_SAFE_NO_PAD.encode(signature),
        }
    }

    /// Verifies the signature with `signer_key` and returns the document,
    /// which must describe `expected_did`.
    ///
    /// # Errors
    ///
    /// Returns [`DidExchangeDomainError::BadSignature`],
    /// [`DidExchangeDomainError::MalformedEncoding`] or
    /// [`DidExchangeDomainError::DidMismatch`].
    pub fn verify(
        &self,
        signer_key: &[u8],
        expected_did: &str,
    ) -> Result<DidDocument, DidExchangeDomainError> {
        let signature = URL_SAFE_NO_PAD
            .decode(&self.signature)
            .map_err(|_| DidExchangeDomainError::MalformedEncoding("signature"))?;
        verify_ed25519(&signature, self.data.as_bytes(), signer_key)
            .map_err(|_| DidExchangeDomainError::BadSignature)?;

        let document_bytes = URL_SAFE_NO_PAD
            .decode(&self.data)
            .map_err(|_| DidExchangeDomainError::MalformedEncoding("did_doc_attach"))?;
        let document: DidDocument = serde_json::from_slice(&document_bytes)
            .map_err(|_| DidExchangeDomainError::MalformedEncoding("did_doc_attach"))?;
        if document.id != expected_did {
            return Err(DidExchangeDomainError::DidMismatch {
                expected: expected_did.to_owned(),
                attached: document.id,
            });
        }
        Ok(document)
    }
}
