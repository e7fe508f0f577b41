//! Then steps for agent provisioning BDD scenarios.

use super::scenario_world::{ProvisioningWorld, run_async};
use didcomm_harness::provisioning::services::{ProvisioningError, TransportProvisionError};
use didcomm_harness::registry::RegistryError;
use didcomm_harness::runtime::AgentRuntimeError;
use eyre::{WrapErr, eyre};
use rstest_bdd_macros::then;
use std::collections::HashSet;
use tokio::net::TcpStream;

/// Assert a condition, returning an error with the given message if false.
fn assert_that(condition: bool, message: impl Into<String>) -> Result<(), eyre::Report> {
    if condition {
        Ok(())
    } else {
        Err(eyre!(message.into()))
    }
}

#[then(r#""{agent}" is registered with an unprivileged port"#)]
fn registered_with_unprivileged_port(
    world: &mut ProvisioningWorld,
    agent: String,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let bindings = entry.agent().bindings();
    assert_that(!bindings.is_empty(), format!("{agent} has no listener"))?;
    for binding in bindings {
        assert_that(
            binding.port() >= 1024,
            format!("{agent} listens on privileged port {}", binding.port()),
        )?;
    }
    Ok(())
}

#[then(r#""{agent}" accepts connections on every listener"#)]
fn accepts_connections(world: &mut ProvisioningWorld, agent: String) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    for binding in entry.agent().bindings() {
        let address = binding.address();
        run_async(TcpStream::connect(address.as_str()))
            .wrap_err_with(|| format!("{agent} should accept connections on {address}"))?;
    }
    Ok(())
}

#[then(r#""{agent}" listens on {count:usize} distinct addresses"#)]
fn listens_on_distinct_addresses(
    world: &mut ProvisioningWorld,
    agent: String,
    count: usize,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let addresses: HashSet<String> = entry
        .agent()
        .bindings()
        .iter()
        .map(|binding| binding.address())
        .collect();
    assert_that(
        addresses.len() == count && entry.agent().bindings().len() == count,
        format!("expected {count} distinct addresses, got {addresses:?}"),
    )
}

#[then(r#""{agent}" dispatches over "{schemes}""#)]
fn dispatches_over(
    world: &mut ProvisioningWorld,
    agent: String,
    schemes: String,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let actual = entry.messenger().outbound_names().join(",");
    assert_that(
        actual == schemes,
        format!("expected outbound {schemes}, got {actual}"),
    )
}

#[then(r#""{agent}" uses media type profile "{profile}""#)]
fn uses_media_type_profile(
    world: &mut ProvisioningWorld,
    agent: String,
    profile: String,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let accepted = entry.context().accepted_profiles();
    assert_that(
        accepted.first() == Some(&profile),
        format!("expected preferred profile {profile}, got {accepted:?}"),
    )
}

#[then(r#""{agent}" uses key type "{key_type}" and key agreement type "{key_agreement_type}""#)]
fn uses_key_types(
    world: &mut ProvisioningWorld,
    agent: String,
    key_type: String,
    key_agreement_type: String,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let options = entry.context().options();
    assert_that(
        options.key_type().as_str() == key_type,
        format!("expected key type {key_type}, got {}", options.key_type()),
    )?;
    assert_that(
        options.key_agreement_type().as_str() == key_agreement_type,
        format!(
            "expected key agreement type {key_agreement_type}, got {}",
            options.key_agreement_type()
        ),
    )
}

#[then(r#""{agent}" advertises no inbound endpoint"#)]
fn advertises_no_endpoint(world: &mut ProvisioningWorld, agent: String) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    assert_that(
        entry.agent().bindings().is_empty(),
        format!("{agent} should have no listeners"),
    )?;
    assert_that(
        entry.context().service_endpoint().is_none(),
        format!("{agent} should advertise no endpoint"),
    )
}

#[then(r#""{agent}" returns messages on route "{route}""#)]
fn returns_on_route(
    world: &mut ProvisioningWorld,
    agent: String,
    route: String,
) -> Result<(), eyre::Report> {
    let entry = world.agent(&agent)?;
    let actual = entry.context().return_route();
    assert_that(
        actual == Some(route.as_str()),
        format!("expected return route {route}, got {actual:?}"),
    )
}

#[then("provisioning fails with an unsupported transport error")]
fn fails_with_unsupported_transport(world: &mut ProvisioningWorld) -> Result<(), eyre::Report> {
    match world.last_error()? {
        ProvisioningError::Transport {
            source: TransportProvisionError::UnsupportedScheme(_),
            ..
        } => Ok(()),
        other => Err(eyre!("expected unsupported scheme, got {other}")),
    }
}

#[then("provisioning fails with an invalid request error")]
fn fails_with_invalid_request(world: &mut ProvisioningWorld) -> Result<(), eyre::Report> {
    match world.last_error()? {
        ProvisioningError::InvalidRequest { .. } => Ok(()),
        other => Err(eyre!("expected invalid request, got {other}")),
    }
}

#[then("provisioning fails with a key store setup error")]
fn fails_with_key_store_setup(world: &mut ProvisioningWorld) -> Result<(), eyre::Report> {
    match world.last_error()? {
        ProvisioningError::KeyStoreSetupFailed { .. } => Ok(()),
        other => Err(eyre!("expected key store setup failure, got {other}")),
    }
}

#[then("provisioning fails with a listener bind error")]
fn fails_with_listener_bind(world: &mut ProvisioningWorld) -> Result<(), eyre::Report> {
    match world.last_error()? {
        ProvisioningError::Runtime {
            source: AgentRuntimeError::ListenerBindFailed { .. },
            ..
        } => Ok(()),
        other => Err(eyre!("expected listener bind failure, got {other}")),
    }
}

#[then("provisioning fails with a duplicate agent error")]
fn fails_with_duplicate_agent(world: &mut ProvisioningWorld) -> Result<(), eyre::Report> {
    match world.last_error()? {
        ProvisioningError::Registry(RegistryError::DuplicateAgent(_)) => Ok(()),
        other => Err(eyre!("expected duplicate agent, got {other}")),
    }
}

#[then(r#""{agent}" is not registered"#)]
fn not_registered(world: &mut ProvisioningWorld, agent: String) -> Result<(), eyre::Report> {
    assert_that(
        !world.registry().contains(&agent),
        format!("{agent} should not be registered"),
    )
}
