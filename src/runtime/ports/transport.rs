//! Inbound listener and outbound dispatcher ports.

use crate::provisioning::domain::{TransportBinding, TransportScheme};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A raw message received by an inbound listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Envelope bytes as received.
    pub payload: Vec<u8>,
    /// Listener scheme that received the message.
    pub scheme: TransportScheme,
}

/// Channel inbound listeners push received messages into.
pub type InboundSender = mpsc::Sender<InboundMessage>;

/// Handle to a running listener task.
#[derive(Debug)]
pub struct ListenerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Wraps a listener task and its shutdown trigger.
    #[must_use]
    pub const fn new(shutdown: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self { shutdown, task }
    }

    /// Signals graceful shutdown and waits for the listener to exit.
    pub async fn stop(self) {
        // The receiver is gone once the server exited on its own.
        let _ignored = self.shutdown.send(());
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "listener task ended abnormally");
        }
    }
}

/// An inbound listener for one transport binding.
#[async_trait]
pub trait InboundTransport: Send + Sync {
    /// Returns the binding this listener serves.
    fn binding(&self) -> &TransportBinding;

    /// Binds the listener at its resolved address and starts serving.
    ///
    /// The port is never re-resolved: if the address cannot be bound, this
    /// fails with [`TransportError::Bind`].
    async fn start(&self, sink: InboundSender) -> TransportResult<ListenerHandle>;
}

/// An outbound dispatcher for one URL family.
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Returns a short dispatcher name (`http`, `websocket`).
    fn name(&self) -> &'static str;

    /// Returns whether this dispatcher can deliver to `url`.
    fn accepts(&self, url: &str) -> bool;

    /// Delivers `payload` to `url`.
    async fn send(&self, payload: &[u8], content_type: &str, url: &str) -> TransportResult<()>;
}

/// Errors returned by transport adapters.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The listener could not bind its address.
    #[error("failed to bind listener on {address}: {source}")]
    Bind {
        /// The `host:port` that could not be bound.
        address: String,
        /// Underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// A message could not be delivered.
    #[error("failed to deliver message to {url}: {reason}")]
    Delivery {
        /// Destination URL.
        url: String,
        /// Failure description.
        reason: String,
    },

    /// The peer rejected the message.
    #[error("peer at {url} rejected message with status {status}")]
    Rejected {
        /// Destination URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
}
