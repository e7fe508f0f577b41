//! When steps for agent provisioning BDD scenarios.

use super::scenario_world::{ProvisioningWorld, attempt_agent, run_async};
use didcomm_harness::provisioning::adapters::LoopbackPortBinder;
use didcomm_harness::provisioning::domain::{
    AgentOptions, InboundRequest, InboundSpec, KeyManagementChoice, PortRequest,
    RemoteKmsSettings,
};
use didcomm_harness::provisioning::ports::PortBinder;
use didcomm_harness::provisioning::services::{CreateAgentRequest, CreateEdgeAgentRequest};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::when;

#[when(
    r#"provisioning "{agent}" on "{host}" port "{port}" with "{scheme}" as the transport provider"#
)]
fn provisioning_agent(
    world: &mut ProvisioningWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
) {
    let result = attempt_agent(world, &agent, &host, &port, &scheme, AgentOptions::default());
    world.last_result = Some(result);
}

#[when(
    r#"provisioning "{agent}" as an edge agent with "{schemes}" outbound and "{route}" as the transport return route option"#
)]
fn provisioning_edge_agent(
    world: &mut ProvisioningWorld,
    agent: String,
    schemes: String,
    route: String,
) {
    let request = CreateEdgeAgentRequest::new(agent, schemes, route);
    world.last_result = Some(run_async(world.lifecycle.create_edge_agent(request)));
}

#[when(r#"provisioning "{agent}" with an unreachable remote key server"#)]
fn provisioning_with_unreachable_key_server(
    world: &mut ProvisioningWorld,
    agent: String,
) -> Result<(), eyre::Report> {
    let unused_port = LoopbackPortBinder::new()
        .bind_ephemeral()
        .wrap_err("an ephemeral port should be available")?;
    let settings = RemoteKmsSettings::new(
        format!("http://127.0.0.1:{unused_port}"),
        "did:example:controller",
    )
    .wrap_err("valid key server settings expected")?;
    let inbound = InboundRequest::single_random("http", "localhost")
        .wrap_err("valid inbound request expected")?;
    let request = CreateAgentRequest::new(agent, inbound)
        .with_key_management(KeyManagementChoice::Remote(settings));

    world.last_result = Some(run_async(world.lifecycle.create_agent(request)));
    Ok(())
}

#[when(r#"provisioning "{agent}" on the port already used by "{other}""#)]
fn provisioning_on_occupied_port(
    world: &mut ProvisioningWorld,
    agent: String,
    other: String,
) -> Result<(), eyre::Report> {
    let occupied = world.agent(&other)?;
    let binding = occupied
        .agent()
        .bindings()
        .first()
        .ok_or_else(|| eyre!("{other} should have a listener"))?;
    let spec = InboundSpec::new("http", binding.host(), PortRequest::Fixed(binding.port()))
        .wrap_err("valid inbound spec expected")?;
    let request = CreateAgentRequest::new(agent, InboundRequest::new(vec![spec]));

    world.last_result = Some(run_async(world.lifecycle.create_agent(request)));
    Ok(())
}
