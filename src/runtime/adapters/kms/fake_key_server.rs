//! In-process key server answering keystore creation, for tests.

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderName, StatusCode};
use axum::http::header::LOCATION;
use axum::routing::post;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Keystore URL returned in the `Location` header.
pub(crate) const KEYSTORE_PATH: &str = "/v1/keystores/ks-1";

/// Counts `POST /v1/keystores` calls and answers `201 Created`.
pub(crate) struct FakeKeyServer {
    url: String,
    keystore_hits: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeKeyServer {
    pub(crate) async fn start() -> Self {
        let keystore_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/v1/keystores", post(create_keystore))
            .with_state(Arc::clone(&keystore_hits));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("fake key server should bind");
        let address = listener
            .local_addr()
            .expect("fake key server should have an address");
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router).await {
                tracing::warn!(error = %err, "fake key server failed");
            }
        });

        Self {
            url: format!("http://{address}"),
            keystore_hits,
            task,
        }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn keystore_hits(&self) -> usize {
        self.keystore_hits.load(Ordering::SeqCst)
    }
}

impl Drop for FakeKeyServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn create_keystore(
    State(hits): State<Arc<AtomicUsize>>,
) -> (StatusCode, [(HeaderName, &'static str); 1]) {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::CREATED, [(LOCATION, KEYSTORE_PATH)])
}
