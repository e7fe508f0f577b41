//! Plain JSON message envelope exchanged between agents.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A message on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message identifier.
    pub id: String,
    /// Message type URI.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Thread identifier; the first message of a thread uses its own id.
    pub thid: String,
    /// Parent thread identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
    /// Type-specific body.
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// Creates an envelope that opens a new thread.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when `body` cannot be serialised.
    pub fn new_thread(
        message_type: &str,
        body: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        let id = Uuid::new_v4().to_string();
        Ok(Self {
            thid: id.clone(),
            id,
            message_type: message_type.to_owned(),
            pthid: None,
            body: serde_json::to_value(body)?,
        })
    }

    /// Creates an envelope continuing thread `thid`.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when `body` cannot be serialised.
    pub fn reply(
        message_type: &str,
        thid: &str,
        body: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            message_type: message_type.to_owned(),
            thid: thid.to_owned(),
            pthid: None,
            body: serde_json::to_value(body)?,
        })
    }

    /// Sets the parent thread.
    #[must_use]
    pub fn with_parent_thread(mut self, pthid: impl Into<String>) -> Self {
        self.pthid = Some(pthid.into());
        self
    }

    /// Decodes the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the body does not match `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }

    /// Encodes the envelope as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes an envelope from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] for malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
