//! When steps for connection establishment BDD scenarios.

use std::sync::Arc;

use super::scenario_world::{ConnectionWorld, run_async};
use didcomm_harness::didexchange::domain::Invitation;
use didcomm_harness::provisioning::domain::{ProtocolVersion, TransportBinding};
use didcomm_harness::runtime::adapters::transport::HttpOutbound;
use didcomm_harness::runtime::{Envelope, Messenger};
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::when;
use serde_json::json;

#[when(r#""{inviter}" exchange DIDs V2 with "{invitee}""#)]
fn exchange_dids(
    world: &mut ConnectionWorld,
    inviter: String,
    invitee: String,
) -> Result<(), eyre::Report> {
    let outcome = run_async(world.orchestrator.establish(&inviter, &invitee))
        .wrap_err_with(|| format!("{inviter} should connect to {invitee}"))?;
    world.outcomes.push(outcome);
    Ok(())
}

#[when(r#""{inviter}" exchange DIDs V2 with new agent "{invitee}""#)]
fn exchange_dids_with_new_agent(
    world: &mut ConnectionWorld,
    inviter: String,
    invitee: String,
) -> Result<(), eyre::Report> {
    let outcome = run_async(world.orchestrator.establish_with_new_agents(
        &world.lifecycle,
        &inviter,
        &invitee,
    ))
    .wrap_err_with(|| format!("{inviter} should connect to new agent {invitee}"))?;
    world.outcomes.push(outcome);
    Ok(())
}

#[when(r#""{inviter}" attempts to connect to "{invitee}""#)]
fn attempt_connection(world: &mut ConnectionWorld, inviter: String, invitee: String) {
    match run_async(world.orchestrator.establish(&inviter, &invitee)) {
        Ok(outcome) => world.outcomes.push(outcome),
        Err(err) => world.last_error = Some(err),
    }
}

#[when(r#""{agent}" receives a public invitation from "{did}""#)]
fn receive_public_invitation(
    world: &mut ConnectionWorld,
    agent: String,
    did: String,
) -> Result<(), eyre::Report> {
    let entry = world
        .registry()
        .lookup(&agent)
        .wrap_err_with(|| format!("{agent} should be registered"))?;
    let invitation = Invitation::public("Issuer", &did, Vec::new());
    let received = run_async(entry.agent().didexchange().receive_invitation(&invitation));
    world.last_invitation = Some(received);
    Ok(())
}

#[when(r#"a "{message_type}" message is sent to "{agent}""#)]
fn send_custom_message(
    world: &mut ConnectionWorld,
    message_type: String,
    agent: String,
) -> Result<(), eyre::Report> {
    let entry = world
        .registry()
        .lookup(&agent)
        .wrap_err_with(|| format!("{agent} should be registered"))?;
    let url = entry
        .agent()
        .bindings()
        .first()
        .map(TransportBinding::advertised_url)
        .ok_or_else(|| eyre!("{agent} has no inbound endpoint"))?;
    let envelope = Envelope::new_thread(&message_type, &json!({ "comment": "ping" }))
        .wrap_err("encode message")?;
    let messenger = Messenger::new(
        vec![Arc::new(HttpOutbound::new(reqwest::Client::new()))],
        ProtocolVersion::V2,
    );
    run_async(messenger.send(&envelope, &url))
        .wrap_err_with(|| format!("deliver {message_type} to {agent}"))?;
    Ok(())
}
