//! Then steps for connection establishment BDD scenarios.

use super::scenario_world::{ConnectionWorld, run_async};
use didcomm_harness::didexchange::DidExchangeError;
use didcomm_harness::didexchange::domain::{ConnectionId, ConnectionState, Role};
use didcomm_harness::handshake::HandshakeError;
use didcomm_harness::registry::RegistryError;
use didcomm_harness::runtime::ports::VdrError;
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;
use std::collections::HashSet;
use std::time::Duration;

/// Quiet period during which no further state event may arrive.
const SETTLE_PERIOD: Duration = Duration::from_millis(200);

/// How long a message service may take to see a delivered message.
const DELIVERY_DEADLINE: Duration = Duration::from_secs(5);

/// Interval between checks of a message service.
const DELIVERY_POLL: Duration = Duration::from_millis(25);

fn assert_that(condition: bool, message: impl Into<String>) -> Result<(), eyre::Report> {
    if condition {
        Ok(())
    } else {
        Err(eyre!(message.into()))
    }
}

/// Checks that `agent` holds `connection_id` in the completed state on `thread_id`.
fn expect_completed(
    world: &ConnectionWorld,
    agent: &str,
    connection_id: ConnectionId,
    thread_id: &str,
) -> Result<(), eyre::Report> {
    let entry = world
        .registry()
        .lookup(agent)
        .wrap_err_with(|| format!("{agent} should be registered"))?;
    let record = entry
        .agent()
        .didexchange()
        .connection(connection_id)
        .wrap_err_with(|| format!("{agent} should hold connection {connection_id}"))?;
    assert_that(
        record.state() == ConnectionState::Completed,
        format!("{agent} connection is {}, not completed", record.state()),
    )?;
    assert_that(
        record.thread_id() == thread_id,
        format!("{agent} connection is on thread {}", record.thread_id()),
    )
}

#[then(r#""{inviter}" and "{invitee}" hold completed connections on one thread"#)]
fn completed_on_one_thread(
    world: &mut ConnectionWorld,
    inviter: String,
    invitee: String,
) -> Result<(), eyre::Report> {
    let outcome = world.last_outcome()?;
    assert_that(
        outcome.inviter.as_str() == inviter && outcome.invitee.as_str() == invitee,
        format!("last handshake was {} -> {}", outcome.inviter, outcome.invitee),
    )?;
    expect_completed(world, &inviter, outcome.inviter_connection, &outcome.thread_id)?;
    expect_completed(world, &invitee, outcome.invitee_connection, &outcome.thread_id)
}

#[then(r#"no further connection state is published by "{inviter}" or "{invitee}""#)]
fn no_further_state(
    world: &mut ConnectionWorld,
    inviter: String,
    invitee: String,
) -> Result<(), eyre::Report> {
    let mut subscriptions = Vec::new();
    for agent in [&inviter, &invitee] {
        let entry = world
            .registry()
            .lookup(agent)
            .wrap_err_with(|| format!("{agent} should be registered"))?;
        subscriptions.push((agent, entry.agent().subscribe_states()));
    }

    run_async(tokio::time::sleep(SETTLE_PERIOD));

    for (agent, subscription) in &mut subscriptions {
        if let Some(event) = subscription.try_next() {
            return Err(eyre!("{agent} published {} after completion", event.state));
        }
    }
    Ok(())
}

#[then(r#""{first}" and "{second}" are registered"#)]
fn both_registered(
    world: &mut ConnectionWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    for agent in [&first, &second] {
        assert_that(
            world.registry().contains(agent),
            format!("{agent} should be registered"),
        )?;
    }
    Ok(())
}

#[then("the handshakes share no thread")]
fn handshakes_share_no_thread(world: &mut ConnectionWorld) -> Result<(), eyre::Report> {
    let threads: HashSet<&str> = world
        .outcomes
        .iter()
        .map(|outcome| outcome.thread_id.as_str())
        .collect();
    assert_that(
        world.outcomes.len() >= 2 && threads.len() == world.outcomes.len(),
        format!("expected one thread per handshake, got {threads:?}"),
    )
}

#[then(r#"the handshake fails because "{agent}" is not registered"#)]
fn fails_not_registered(world: &mut ConnectionWorld, agent: String) -> Result<(), eyre::Report> {
    match world.last_error()? {
        HandshakeError::Registry(RegistryError::NotFound(missing)) if *missing == agent => Ok(()),
        other => Err(eyre!("expected {agent} not found, got {other}")),
    }
}

#[then(r#"the handshake fails at the "{stage}" stage"#)]
fn fails_at_stage(world: &mut ConnectionWorld, stage: String) -> Result<(), eyre::Report> {
    match world.last_error()? {
        HandshakeError::DidExchange { stage: failed, .. } if failed.as_str() == stage => Ok(()),
        other => Err(eyre!("expected failure at {stage}, got {other}")),
    }
}

#[then(r#""{agent}" holds an invited connection to "{did}""#)]
fn invited_connection_to(
    world: &mut ConnectionWorld,
    agent: String,
    did: String,
) -> Result<(), eyre::Report> {
    let connection_id = match &world.last_invitation {
        Some(Ok(connection_id)) => *connection_id,
        Some(Err(err)) => return Err(eyre!("{agent} refused the invitation: {err}")),
        None => return Err(eyre!("{agent} received no invitation")),
    };
    let entry = world
        .registry()
        .lookup(&agent)
        .wrap_err_with(|| format!("{agent} should be registered"))?;
    let record = entry
        .agent()
        .didexchange()
        .connection(connection_id)
        .wrap_err_with(|| format!("{agent} should hold connection {connection_id}"))?;
    assert_that(
        record.role() == Role::Invitee && record.state() == ConnectionState::Invited,
        format!("{agent} connection is {} as {:?}", record.state(), record.role()),
    )?;
    assert_that(
        record.peer().did.as_deref() == Some(did.as_str()),
        format!("{agent} connection names peer {:?}", record.peer().did),
    )?;
    assert_that(
        record.peer().endpoint == "http://localhost:9",
        format!("{agent} connection targets {}", record.peer().endpoint),
    )
}

#[then(r#"the DID resolver was asked for "{did}""#)]
fn resolver_was_asked(world: &mut ConnectionWorld, did: String) -> Result<(), eyre::Report> {
    let requests = world.resolver()?.requests()?;
    assert_that(
        requests == vec![did.clone()],
        format!("expected one lookup of {did}, got {requests:?}"),
    )
}

#[then(r#"the invitation is refused because "{did}" cannot be resolved"#)]
fn invitation_refused(world: &mut ConnectionWorld, did: String) -> Result<(), eyre::Report> {
    match &world.last_invitation {
        Some(Err(DidExchangeError::Resolution(VdrError::NotFound(missing)))) if *missing == did => {
            Ok(())
        }
        Some(Err(other)) => Err(eyre!("expected {did} not found, got {other}")),
        Some(Ok(connection_id)) => Err(eyre!("invitation was accepted as {connection_id}")),
        None => Err(eyre!("no invitation was received")),
    }
}

#[then(r#""{agent}" holds no connections"#)]
fn holds_no_connections(world: &mut ConnectionWorld, agent: String) -> Result<(), eyre::Report> {
    let entry = world
        .registry()
        .lookup(&agent)
        .wrap_err_with(|| format!("{agent} should be registered"))?;
    let connections = entry
        .agent()
        .didexchange()
        .connections()
        .wrap_err("list connections")?;
    assert_that(
        connections.is_empty(),
        format!("{agent} holds {} connections", connections.len()),
    )
}

#[then(r#"the message service of "{agent}" receives a "{message_type}" message"#)]
fn service_receives(
    world: &mut ConnectionWorld,
    agent: String,
    message_type: String,
) -> Result<(), eyre::Report> {
    let service = world
        .services
        .get(&agent)
        .ok_or_else(|| eyre!("{agent} has no message service"))?;
    let deadline = tokio::time::Instant::now() + DELIVERY_DEADLINE;
    loop {
        let received = service.received_types()?;
        if received.contains(&message_type) {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(eyre!("{agent} service only saw {received:?}"));
        }
        run_async(tokio::time::sleep(DELIVERY_POLL));
    }
}
