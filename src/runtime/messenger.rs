//! Outbound message dispatch.

use super::envelope::Envelope;
use crate::provisioning::domain::ProtocolVersion;
use crate::runtime::ports::{OutboundTransport, TransportError};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while sending messages.
#[derive(Debug, Clone, Error)]
pub enum MessengerError {
    /// No outbound dispatcher handles the destination URL.
    #[error("no outbound transport accepts {0}")]
    NoOutbound(String),

    /// The envelope could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(Arc<serde_json::Error>),

    /// The dispatcher failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Sends envelopes through the first outbound dispatcher accepting the
/// destination URL.
#[derive(Clone)]
pub struct Messenger {
    outbound: Arc<[Arc<dyn OutboundTransport>]>,
    version: ProtocolVersion,
}

impl Messenger {
    /// Creates a messenger over `outbound`, labelling payloads for `version`.
    #[must_use]
    pub fn new(outbound: Vec<Arc<dyn OutboundTransport>>, version: ProtocolVersion) -> Self {
        Self {
            outbound: outbound.into(),
            version,
        }
    }

    /// Returns the names of the attached dispatchers in order.
    #[must_use]
    pub fn outbound_names(&self) -> Vec<&'static str> {
        self.outbound.iter().map(|transport| transport.name()).collect()
    }

    /// Returns the protocol version of sent payloads.
    #[must_use]
    pub const fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    /// Sends `envelope` to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`MessengerError::NoOutbound`] when no dispatcher accepts the
    /// URL, or the dispatcher's failure.
    pub async fn send(&self, envelope: &Envelope, url: &str) -> Result<(), MessengerError> {
        let transport = self
            .outbound
            .iter()
            .find(|transport| transport.accepts(url))
            .ok_or_else(|| MessengerError::NoOutbound(url.to_owned()))?;
        let payload = envelope
            .to_bytes()
            .map_err(|err| MessengerError::Encode(Arc::new(err)))?;

        tracing::debug!(
            url,
            transport = transport.name(),
            message_type = %envelope.message_type,
            "sending message"
        );
        transport
            .send(&payload, self.version.content_type(), url)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Messenger")
            .field("outbound", &self.outbound_names())
            .field("version", &self.version)
            .finish()
    }
}
