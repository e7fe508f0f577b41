//! Integration tests for loading the harness configuration from the process
//! environment.

mod test_helpers;

use didcomm_harness::config::{HarnessConfig, StorageKind};
use rstest::rstest;
use std::time::Duration;
use test_helpers::EnvVarGuard;

#[rstest]
fn environment_overrides_defaults() {
    let _guard = EnvVarGuard::set_many(&[
        ("DIDCOMM_HARNESS_LISTEN_TIMEOUT_MS", Some("750")),
        ("DIDCOMM_HARNESS_STORAGE", Some("memory")),
        ("DIDCOMM_HARNESS_HANDSHAKE_TIMEOUT_MS", None),
    ]);

    let config = HarnessConfig::from_env().expect("configuration should load");

    assert_eq!(config.listen_timeout(), Duration::from_millis(750));
    assert_eq!(config.storage, StorageKind::Memory);
    assert_eq!(config.handshake_timeout(), Duration::from_secs(20));
}

#[rstest]
fn malformed_variable_is_reported() {
    let _guard = EnvVarGuard::set_many(&[("DIDCOMM_HARNESS_PORT_ATTEMPTS", Some("many"))]);

    assert!(HarnessConfig::from_env().is_err());
}
