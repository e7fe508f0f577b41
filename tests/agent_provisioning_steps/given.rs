//! Given steps for agent provisioning BDD scenarios.

use super::scenario_world::{ProvisioningWorld, attempt_agent, run_async};
use didcomm_harness::config::HarnessConfig;
use didcomm_harness::provisioning::domain::{
    AgentOptions, KeyType, MediaTypeProfile, ProtocolVersion,
};
use didcomm_harness::provisioning::services::CreateEdgeAgentRequest;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("the harness keeps agent state in memory")]
fn harness_in_memory(world: &mut ProvisioningWorld) {
    *world = ProvisioningWorld::with_config(&HarnessConfig::default().in_memory());
}

#[given(r#"all agents are using Media Type Profiles "{profiles}""#)]
fn shared_media_type_profiles(
    world: &mut ProvisioningWorld,
    profiles: String,
) -> Result<(), eyre::Report> {
    world.shared_profiles =
        MediaTypeProfile::parse_list(&profiles).wrap_err("valid profiles expected")?;
    Ok(())
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider"#
)]
fn agent_running(
    world: &mut ProvisioningWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
) -> Result<(), eyre::Report> {
    let options = world.default_options();
    attempt_agent(world, &agent, &host, &port, &scheme, options)
        .wrap_err_with(|| format!("provision {agent}"))?;
    Ok(())
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider using DIDCommV2"#
)]
fn agent_running_v2(
    world: &mut ProvisioningWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
) -> Result<(), eyre::Report> {
    let options = AgentOptions::for_version(ProtocolVersion::V2);
    attempt_agent(world, &agent, &host, &port, &scheme, options)
        .wrap_err_with(|| format!("provision {agent}"))?;
    Ok(())
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider and options "{key_type}" "{key_agreement_type}" "{profiles}""#
)]
#[expect(clippy::too_many_arguments, reason = "one argument per step placeholder")]
fn agent_running_with_options(
    world: &mut ProvisioningWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
    key_type: String,
    key_agreement_type: String,
    profiles: String,
) -> Result<(), eyre::Report> {
    let options = AgentOptions::default()
        .with_key_type(KeyType::try_from(key_type.as_str()).wrap_err("valid key type expected")?)
        .with_key_agreement_type(
            KeyType::try_from(key_agreement_type.as_str())
                .wrap_err("valid key agreement type expected")?,
        )
        .with_media_type_profiles(
            MediaTypeProfile::parse_list(&profiles).wrap_err("valid profiles expected")?,
        );
    attempt_agent(world, &agent, &host, &port, &scheme, options)
        .wrap_err_with(|| format!("provision {agent}"))?;
    Ok(())
}

#[given(
    r#""{agent}" edge agent is running with "{schemes}" as the outbound transport provider and "{route}" as the transport return route option"#
)]
fn edge_agent_running(
    world: &mut ProvisioningWorld,
    agent: String,
    schemes: String,
    route: String,
) -> Result<(), eyre::Report> {
    let request = CreateEdgeAgentRequest::new(agent.as_str(), schemes, route);
    run_async(world.lifecycle.create_edge_agent(request))
        .wrap_err_with(|| format!("provision edge agent {agent}"))?;
    Ok(())
}
