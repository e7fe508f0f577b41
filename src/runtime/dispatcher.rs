//! Inbound message loop: decodes envelopes and routes them to services.

use super::envelope::Envelope;
use super::registrar::MessageRegistrar;
use crate::didexchange::DidExchangeClient;
use crate::didexchange::domain::DIDEXCHANGE_PREFIX;
use crate::provisioning::domain::AgentId;
use crate::runtime::ports::{InboundMessage, ListenerHandle};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub(super) struct Dispatcher {
    pub(super) agent_id: AgentId,
    pub(super) didexchange: DidExchangeClient,
    pub(super) registrar: Option<Arc<MessageRegistrar>>,
}

impl Dispatcher {
    /// Runs the loop until shut down or every sender is dropped.
    pub(super) fn spawn(self, mut inbox: mpsc::Receiver<InboundMessage>) -> ListenerHandle {
        let (shutdown, mut signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut signal => break,
                    received = inbox.recv() => match received {
                        Some(message) => self.dispatch(message).await,
                        None => break,
                    },
                }
            }
            tracing::debug!(agent_id = %self.agent_id, "inbound dispatcher stopped");
        });
        ListenerHandle::new(shutdown, task)
    }

    async fn dispatch(&self, message: InboundMessage) {
        let envelope = match Envelope::from_bytes(&message.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(
                    agent_id = %self.agent_id,
                    scheme = %message.scheme,
                    error = %err,
                    "dropping undecodable inbound message"
                );
                return;
            }
        };

        if envelope.message_type.starts_with(DIDEXCHANGE_PREFIX) {
            let message_type = envelope.message_type.clone();
            if let Err(err) = self.didexchange.handle_inbound(envelope).await {
                tracing::warn!(
                    agent_id = %self.agent_id,
                    message_type = %message_type,
                    error = %err,
                    "DID exchange message rejected"
                );
            }
            return;
        }

        let service = self
            .registrar
            .as_ref()
            .map(|registrar| registrar.find(&envelope.message_type))
            .transpose();
        match service {
            Ok(Some(Some(service))) => {
                if let Err(err) = service.handle(envelope).await {
                    tracing::warn!(agent_id = %self.agent_id, error = %err, "message service failed");
                }
            }
            Ok(_) => tracing::warn!(
                agent_id = %self.agent_id,
                message_type = %envelope.message_type,
                "no service handles inbound message type"
            ),
            Err(err) => tracing::warn!(agent_id = %self.agent_id, error = %err, "registrar unavailable"),
        }
    }
}
