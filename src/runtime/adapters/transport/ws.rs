//! DIDComm over WebSocket: an axum upgrade listener and a tungstenite dispatcher.

use crate::provisioning::domain::{TransportBinding, TransportScheme};
use crate::runtime::ports::{
    InboundMessage, InboundSender, InboundTransport, ListenerHandle, OutboundTransport,
    TransportError, TransportResult,
};
use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message as ClientMessage;

/// Inbound WebSocket listener; each frame carries one envelope.
#[derive(Debug, Clone)]
pub struct WsInbound {
    binding: TransportBinding,
}

impl WsInbound {
    /// Creates a listener for `binding`. Nothing is bound until started.
    #[must_use]
    pub const fn new(binding: TransportBinding) -> Self {
        Self { binding }
    }
}

async fn upgrade(State(sink): State<InboundSender>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| read_frames(socket, sink))
}

async fn read_frames(mut socket: WebSocket, sink: InboundSender) {
    while let Some(frame) = socket.recv().await {
        let payload = match frame {
            Ok(Message::Text(text)) => text.as_str().as_bytes().to_vec(),
            Ok(Message::Binary(bytes)) => bytes.to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(error = %err, "websocket read failed");
                break;
            }
        };

        let message = InboundMessage {
            payload,
            scheme: TransportScheme::WebSocket,
        };
        if sink.send(message).await.is_err() {
            break;
        }
    }
}

#[async_trait]
impl InboundTransport for WsInbound {
    fn binding(&self) -> &TransportBinding {
        &self.binding
    }

    async fn start(&self, sink: InboundSender) -> TransportResult<ListenerHandle> {
        let address = self.binding.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|err| TransportError::Bind {
                address: address.clone(),
                source: Arc::new(err),
            })?;

        let router = Router::new().route("/", get(upgrade)).with_state(sink);
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _closed = signal.await;
                })
                .await;
            if let Err(err) = served {
                tracing::warn!(address = %address, error = %err, "websocket listener failed");
            }
        });

        tracing::debug!(address = %self.binding.address(), "websocket listener started");
        Ok(ListenerHandle::new(shutdown, task))
    }
}

/// Outbound WebSocket dispatcher opening one connection per message.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsOutbound;

impl WsOutbound {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutboundTransport for WsOutbound {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with("ws://") || url.starts_with("wss://")
    }

    async fn send(&self, payload: &[u8], _content_type: &str, url: &str) -> TransportResult<()> {
        let delivery_error = |reason: String| TransportError::Delivery {
            url: url.to_owned(),
            reason,
        };

        let (mut stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| delivery_error(err.to_string()))?;
        stream
            .send(ClientMessage::Binary(payload.to_vec()))
            .await
            .map_err(|err| delivery_error(err.to_string()))?;
        if let Err(err) = stream.close(None).await {
            tracing::debug!(url, error = %err, "websocket close after delivery failed");
        }
        Ok(())
    }
}
