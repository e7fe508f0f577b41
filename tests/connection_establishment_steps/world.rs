//! Shared world state for connection establishment BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use super::peers::{FakeResolver, RecordingService};
use didcomm_harness::config::HarnessConfig;
use didcomm_harness::didexchange::DidExchangeError;
use didcomm_harness::didexchange::domain::ConnectionId;
use didcomm_harness::handshake::{ConnectionOrchestrator, HandshakeError, HandshakeOutcome};
use didcomm_harness::provisioning::services::AgentLifecycleService;
use didcomm_harness::registry::AgentRegistry;
use didcomm_harness::telemetry::init_tracing;
use eyre::eyre;
use rstest::fixture;

/// Per-event deadline used by scenario handshakes.
const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// Scenario world for connection establishment behaviour tests.
pub struct ConnectionWorld {
    /// Provisions the scenario's agents.
    pub lifecycle: AgentLifecycleService,
    /// Drives handshakes between registered agents.
    pub orchestrator: ConnectionOrchestrator,
    /// Completed handshakes in the order they finished.
    pub outcomes: Vec<HandshakeOutcome>,
    /// Error of the last failed handshake attempt.
    pub last_error: Option<HandshakeError>,
    /// DID resolver agents of the scenario may be attached to.
    pub resolver: Option<FakeResolver>,
    /// DID method the resolver serves.
    pub resolver_method: String,
    /// Message services by the agent they were registered with.
    pub services: HashMap<String, Arc<RecordingService>>,
    /// Result of the last public invitation an agent received.
    pub last_invitation: Option<Result<ConnectionId, DidExchangeError>>,
}

impl ConnectionWorld {
    /// Creates a world whose services share one registry built from `config`.
    #[must_use]
    pub fn with_config(config: &HarnessConfig) -> Self {
        let _installed = init_tracing("didcomm_harness=debug");
        let registry = Arc::new(AgentRegistry::new());
        Self {
            lifecycle: AgentLifecycleService::from_config(Arc::clone(&registry), config),
            orchestrator: ConnectionOrchestrator::from_config(registry, config),
            outcomes: Vec::new(),
            last_error: None,
            resolver: None,
            resolver_method: String::new(),
            services: HashMap::new(),
            last_invitation: None,
        }
    }

    /// Returns the registry shared by both services.
    #[must_use]
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.lifecycle.registry()
    }

    /// Returns the most recent completed handshake.
    pub fn last_outcome(&self) -> Result<&HandshakeOutcome, eyre::Report> {
        self.outcomes
            .last()
            .ok_or_else(|| eyre!("no handshake has completed"))
    }

    /// Returns the scenario's DID resolver.
    pub fn resolver(&self) -> Result<&FakeResolver, eyre::Report> {
        self.resolver
            .as_ref()
            .ok_or_else(|| eyre!("no DID resolver is running"))
    }

    /// Returns the error of the last failed handshake attempt.
    pub fn last_error(&self) -> Result<&HandshakeError, eyre::Report> {
        self.last_error
            .as_ref()
            .ok_or_else(|| eyre!("no handshake attempt failed"))
    }
}

/// Default harness settings with a scenario-sized handshake deadline.
#[must_use]
pub fn scenario_config() -> HarnessConfig {
    HarnessConfig {
        handshake_timeout_ms: HANDSHAKE_TIMEOUT_MS,
        ..HarnessConfig::default()
    }
}

impl Default for ConnectionWorld {
    fn default() -> Self {
        Self::with_config(&scenario_config())
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ConnectionWorld {
    ConnectionWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
