//! Given steps for connection establishment BDD scenarios.

use std::sync::Arc;

use super::peers::{FakeResolver, RecordingService};
use super::scenario_world::{ConnectionWorld, run_async, scenario_config};
use didcomm_harness::provisioning::domain::{AgentOptions, InboundRequest, ProtocolVersion};
use didcomm_harness::provisioning::services::{
    CreateAgentRequest, CreateEdgeAgentRequest, DidResolverSettings,
};
use didcomm_harness::runtime::MessageRegistrar;
use didcomm_harness::runtime::did::DidDocument;
use eyre::WrapErr;
use rstest_bdd_macros::given;

/// Endpoint advertised by published DID documents.
const PUBLISHED_ENDPOINT: &str = "http://localhost:9";

fn v2_request(
    agent: &str,
    host: &str,
    port: &str,
    scheme: &str,
) -> Result<CreateAgentRequest, eyre::Report> {
    let inbound =
        InboundRequest::parse(scheme, host, port).wrap_err("valid inbound lists expected")?;
    Ok(CreateAgentRequest::new(agent, inbound)
        .with_options(AgentOptions::for_version(ProtocolVersion::V2)))
}

#[given("the harness keeps agent state in memory")]
fn harness_in_memory(world: &mut ConnectionWorld) {
    *world = ConnectionWorld::with_config(&scenario_config().in_memory());
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider using DIDCommV2"#
)]
fn agent_running_v2(
    world: &mut ConnectionWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
) -> Result<(), eyre::Report> {
    let request = v2_request(&agent, &host, &port, &scheme)?;
    run_async(world.lifecycle.create_agent(request))
        .wrap_err_with(|| format!("provision {agent}"))?;
    Ok(())
}

#[given(
    r#""{agent}" edge agent is running with "{schemes}" as the outbound transport provider and "{route}" as the transport return route option"#
)]
fn edge_agent_running(
    world: &mut ConnectionWorld,
    agent: String,
    schemes: String,
    route: String,
) -> Result<(), eyre::Report> {
    let request = CreateEdgeAgentRequest::new(agent.as_str(), schemes, route)
        .with_options(AgentOptions::for_version(ProtocolVersion::V2));
    run_async(world.lifecycle.create_edge_agent(request))
        .wrap_err_with(|| format!("provision edge agent {agent}"))?;
    Ok(())
}

#[given(r#"a DID resolver publishes "{did}" for the "{method}" method"#)]
fn resolver_publishes(
    world: &mut ConnectionWorld,
    did: String,
    method: String,
) -> Result<(), eyre::Report> {
    let document = DidDocument::peer(&[5_u8; 32], Some(PUBLISHED_ENDPOINT), &[]);
    let resolver = run_async(FakeResolver::start(&did, &document))?;
    world.resolver_method = method;
    world.resolver = Some(resolver);
    Ok(())
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider and the DID resolver"#
)]
fn agent_running_with_resolver(
    world: &mut ConnectionWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
) -> Result<(), eyre::Report> {
    let settings = DidResolverSettings::new(world.resolver()?.url(), world.resolver_method.as_str());
    let request = v2_request(&agent, &host, &port, &scheme)?.with_did_resolver(settings);
    run_async(world.lifecycle.create_agent(request))
        .wrap_err_with(|| format!("provision {agent} with a DID resolver"))?;
    Ok(())
}

#[given(
    r#""{agent}" agent is running on "{host}" port "{port}" with "{scheme}" as the transport provider and a message service for "{prefix}""#
)]
fn agent_running_with_service(
    world: &mut ConnectionWorld,
    agent: String,
    host: String,
    port: String,
    scheme: String,
    prefix: String,
) -> Result<(), eyre::Report> {
    let service = Arc::new(RecordingService::new(prefix));
    let registrar = Arc::new(MessageRegistrar::new());
    registrar
        .register(Arc::clone(&service) as Arc<_>)
        .wrap_err("register message service")?;
    let request = v2_request(&agent, &host, &port, &scheme)?.with_registrar(registrar);
    run_async(world.lifecycle.create_agent(request))
        .wrap_err_with(|| format!("provision {agent} with a message service"))?;
    world.services.insert(agent, service);
    Ok(())
}
