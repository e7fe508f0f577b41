//! Stand-ins for services agents talk to outside the handshake.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use didcomm_harness::runtime::did::DidDocument;
use didcomm_harness::runtime::{Envelope, MessageService, MessageServiceError};
use eyre::{WrapErr, eyre};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Published {
    documents: HashMap<String, Value>,
    requests: Mutex<Vec<String>>,
}

/// HTTP-binding DID resolver serving a fixed set of documents.
pub struct FakeResolver {
    url: String,
    published: Arc<Published>,
    task: JoinHandle<()>,
}

impl FakeResolver {
    /// Serves `document` under `did` on an ephemeral loopback port.
    pub async fn start(did: &str, document: &DidDocument) -> Result<Self, eyre::Report> {
        let mut documents = HashMap::new();
        documents.insert(
            did.to_owned(),
            serde_json::to_value(document).wrap_err("encode DID document")?,
        );
        let published = Arc::new(Published {
            documents,
            requests: Mutex::new(Vec::new()),
        });
        let router = Router::new()
            .route("/{*did}", get(resolve))
            .with_state(Arc::clone(&published));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .wrap_err("bind resolver")?;
        let url = format!("http://{}", listener.local_addr().wrap_err("resolver address")?);
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::warn!(error = %err, "fake resolver stopped");
            }
        });
        Ok(Self {
            url,
            published,
            task,
        })
    }

    /// Returns the resolver base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the DIDs requested so far, in order.
    pub fn requests(&self) -> Result<Vec<String>, eyre::Report> {
        self.published
            .requests
            .lock()
            .map(|requests| requests.clone())
            .map_err(|_| eyre!("resolver request log poisoned"))
    }
}

impl Drop for FakeResolver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn resolve(
    State(published): State<Arc<Published>>,
    Path(did): Path<String>,
) -> (StatusCode, Json<Value>) {
    if let Ok(mut requests) = published.requests.lock() {
        requests.push(did.clone());
    }
    match published.documents.get(&did) {
        Some(document) => (StatusCode::OK, Json(json!({ "didDocument": document }))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "notFound" }))),
    }
}

/// Message service recording every envelope whose type has its prefix.
pub struct RecordingService {
    prefix: String,
    received: Mutex<Vec<Envelope>>,
}

impl RecordingService {
    /// Creates a service accepting message types starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Returns the types of the messages handled so far.
    pub fn received_types(&self) -> Result<Vec<String>, eyre::Report> {
        self.received
            .lock()
            .map(|received| {
                received
                    .iter()
                    .map(|envelope| envelope.message_type.clone())
                    .collect()
            })
            .map_err(|_| eyre!("message log poisoned"))
    }
}

#[async_trait]
impl MessageService for RecordingService {
    fn name(&self) -> &str {
        "recorder"
    }

    fn accepts(&self, message_type: &str) -> bool {
        message_type.starts_with(&self.prefix)
    }

    async fn handle(&self, envelope: Envelope) -> Result<(), MessageServiceError> {
        let mut received = self.received.lock().map_err(|_| MessageServiceError {
            service: self.name().to_owned(),
            reason: "message log poisoned".to_owned(),
        })?;
        received.push(envelope);
        Ok(())
    }
}
