//! Shared world state for agent provisioning BDD scenarios.

use std::sync::Arc;

use didcomm_harness::config::HarnessConfig;
use didcomm_harness::provisioning::domain::{AgentOptions, InboundRequest, MediaTypeProfile};
use didcomm_harness::provisioning::services::{
    AgentLifecycleService, CreateAgentRequest, ProvisioningError,
};
use didcomm_harness::registry::{AgentRegistry, RunningAgent};
use didcomm_harness::telemetry::init_tracing;
use eyre::{WrapErr, eyre};
use rstest::fixture;

/// Scenario world for agent provisioning behaviour tests.
pub struct ProvisioningWorld {
    /// The lifecycle service under test.
    pub lifecycle: AgentLifecycleService,
    /// Profiles applied to agents provisioned without explicit options.
    pub shared_profiles: Vec<MediaTypeProfile>,
    /// Result of the last provisioning attempt made by a `When` step.
    pub last_result: Option<Result<Arc<RunningAgent>, ProvisioningError>>,
}

impl ProvisioningWorld {
    /// Creates a world backed by file storage and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&HarnessConfig::default())
    }

    /// Creates a world whose lifecycle service uses `config`.
    #[must_use]
    pub fn with_config(config: &HarnessConfig) -> Self {
        let _installed = init_tracing("didcomm_harness=debug");
        let lifecycle = AgentLifecycleService::from_config(Arc::new(AgentRegistry::new()), config);
        Self {
            lifecycle,
            shared_profiles: Vec::new(),
            last_result: None,
        }
    }

    /// Returns the registry of the lifecycle service.
    #[must_use]
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.lifecycle.registry()
    }

    /// Looks up a registered agent.
    pub fn agent(&self, agent_id: &str) -> Result<Arc<RunningAgent>, eyre::Report> {
        self.registry()
            .lookup(agent_id)
            .wrap_err_with(|| format!("agent {agent_id} should be registered"))
    }

    /// Default options with the shared media type profiles applied.
    #[must_use]
    pub fn default_options(&self) -> AgentOptions {
        AgentOptions::default().with_media_type_profiles(self.shared_profiles.iter().cloned())
    }

    /// Returns the error of the last provisioning attempt.
    pub fn last_error(&self) -> Result<&ProvisioningError, eyre::Report> {
        match self.last_result.as_ref() {
            Some(Err(err)) => Ok(err),
            Some(Ok(agent)) => Err(eyre!("agent {} was provisioned unexpectedly", agent.id())),
            None => Err(eyre!("no provisioning attempt was made")),
        }
    }
}

impl Default for ProvisioningWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ProvisioningWorld {
    ProvisioningWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Provisions an agent from parallel inbound lists and returns the raw
/// outcome.
pub fn attempt_agent(
    world: &ProvisioningWorld,
    agent_id: &str,
    hosts: &str,
    ports: &str,
    schemes: &str,
    options: AgentOptions,
) -> Result<Arc<RunningAgent>, ProvisioningError> {
    let inbound = InboundRequest::parse(schemes, hosts, ports).map_err(|source| {
        ProvisioningError::InvalidRequest {
            agent_id: agent_id.to_owned(),
            source,
        }
    })?;
    let request = CreateAgentRequest::new(agent_id, inbound).with_options(options);
    run_async(world.lifecycle.create_agent(request))
}
