//! DIDComm over HTTP: an axum inbound listener and a reqwest dispatcher.

use crate::provisioning::domain::{ProtocolVersion, TransportBinding, TransportScheme};
use crate::runtime::ports::{
    InboundMessage, InboundSender, InboundTransport, ListenerHandle, OutboundTransport,
    TransportError, TransportResult,
};
use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const ACCEPTED_CONTENT_TYPES: [&str; 3] = [
    ProtocolVersion::V1.content_type(),
    ProtocolVersion::V2.content_type(),
    "application/json",
];

/// Inbound HTTP listener accepting envelopes via `POST /`.
#[derive(Debug, Clone)]
pub struct HttpInbound {
    binding: TransportBinding,
}

impl HttpInbound {
    /// Creates a listener for `binding`. Nothing is bound until started.
    #[must_use]
    pub const fn new(binding: TransportBinding) -> Self {
        Self { binding }
    }
}

async fn receive_envelope(
    State(sink): State<InboundSender>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let is_accepted = ACCEPTED_CONTENT_TYPES
        .iter()
        .any(|accepted| content_type.starts_with(accepted));
    if !is_accepted {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE;
    }

    let message = InboundMessage {
        payload: body.to_vec(),
        scheme: TransportScheme::Http,
    };
    match sink.send(message).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[async_trait]
impl InboundTransport for HttpInbound {
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

        let router = Router::new()
            .route("/", post(receive_envelope))
            .with_state(sink);
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // A dropped sender also means shut down.
                    let _closed = signal.await;
                })
                .await;
            if let Err(err) = served {
                tracing::warn!(address = %address, error = %err, "http listener failed");
            }
        });

        tracing::debug!(address = %self.binding.address(), "http listener started");
        Ok(ListenerHandle::new(shutdown, task))
    }
}

/// Outbound HTTP dispatcher.
#[derive(Debug, Clone)]
pub struct HttpOutbound {
    client: reqwest::Client,
}

impl HttpOutbound {
    /// Creates a dispatcher using `client`.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OutboundTransport for HttpOutbound {
    fn name(&self) -> &'static str {
        "http"
    }

    fn accepts(&self, url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    async fn send(&self, payload: &[u8], content_type: &str, url: &str) -> TransportResult<()> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE.as_str(), content_type)
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|err| TransportError::Delivery {
                url: url.to_owned(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                url: url.to_owned(),
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tokio::sync::mpsc;

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .map(|address| address.port())
            .expect("a free port should be available")
    }

    #[rstest]
    #[tokio::test]
    async fn delivers_posted_envelopes_to_the_sink() {
        let binding = TransportBinding::new(TransportScheme::Http, "127.0.0.1", free_port());
        let (sink, mut inbox) = mpsc::channel(4);
        let handle = HttpInbound::new(binding.clone())
            .start(sink)
            .await
            .expect("listener should start");

        HttpOutbound::new(reqwest::Client::new())
            .send(
                b"{\"id\":\"1\"}",
                ProtocolVersion::V2.content_type(),
                &binding.advertised_url(),
            )
            .await
            .expect("delivery should succeed");

        let received = inbox.recv().await.expect("message should arrive");
        assert_eq!(received.payload, b"{\"id\":\"1\"}");
        assert_eq!(received.scheme, TransportScheme::Http);
        handle.stop().await;
    }

    #[rstest]
    #[tokio::test]
    async fn rejects_unknown_content_types() {
        let binding = TransportBinding::new(TransportScheme::Http, "127.0.0.1", free_port());
        let (sink, _inbox) = mpsc::channel(4);
        let handle = HttpInbound::new(binding.clone())
            .start(sink)
            .await
            .expect("listener should start");

        let result = HttpOutbound::new(reqwest::Client::new())
            .send(b"hello", "text/plain", &binding.advertised_url())
            .await;

        assert!(matches!(
            result,
            Err(TransportError::Rejected { status: 415, .. })
        ));
        handle.stop().await;
    }

    #[rstest]
    #[tokio::test]
    async fn occupied_address_fails_to_bind() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let port = occupied
            .local_addr()
            .expect("listener should have an address")
            .port();
        let binding = TransportBinding::new(TransportScheme::Http, "127.0.0.1", port);
        let (sink, _inbox) = mpsc::channel(4);

        let result = HttpInbound::new(binding).start(sink).await;

        assert!(matches!(result, Err(TransportError::Bind { .. })));
    }

    #[rstest]
    #[case("http://localhost:1", true)]
    #[case("https://example.com", true)]
    #[case("ws://localhost:1", false)]
    fn http_outbound_accepts_http_urls(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(HttpOutbound::new(reqwest::Client::new()).accepts(url), expected);
    }
}
