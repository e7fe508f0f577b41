//! Agent configurations over in-memory storage, for tests.

use super::adapters::document_loader::{ContextStore, DocumentLoader, RemoteProviderStore};
use super::adapters::kms::LocalKms;
use super::adapters::storage::MemStorageProvider;
use super::adapters::transport::{HttpInbound, HttpOutbound, WsOutbound};
use super::configuration::{AgentConfiguration, AgentConfigurationBuilder};
use crate::provisioning::domain::{AgentId, TransportBinding, TransportScheme};
use crate::runtime::ports::InboundTransport;
use std::sync::Arc;

/// Returns a loopback port that was free a moment ago.
pub(crate) fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|address| address.port())
        .expect("a free port should be available")
}

/// Starts a configuration for `name` listening on HTTP at `127.0.0.1:port`
/// and able to send over both transports.
pub(crate) fn http_agent(name: &str, port: u16) -> AgentConfigurationBuilder {
    let storage = Arc::new(MemStorageProvider::new());
    let keys = LocalKms::open(storage.as_ref())
        .expect("kms store should open")
        .into_key_backend();
    let loader = DocumentLoader::new(
        ContextStore::open(storage.as_ref()).expect("context store should open"),
        RemoteProviderStore::open(storage.as_ref()).expect("provider store should open"),
        &[],
    )
    .expect("loader should build");
    let binding = TransportBinding::new(TransportScheme::Http, "127.0.0.1", port);
    let inbound: Arc<dyn InboundTransport> = Arc::new(HttpInbound::new(binding));

    AgentConfiguration::builder(
        AgentId::new(name).expect("valid agent id"),
        storage,
        keys,
        loader,
    )
    .with_inbound(vec![inbound])
    .with_outbound(vec![
        Arc::new(WsOutbound::new()),
        Arc::new(HttpOutbound::new(reqwest::Client::new())),
    ])
}
