//! Harness configuration loaded from `DIDCOMM_HARNESS_*` environment variables.
//!
//! Every field is optional:
//!
//! - `DIDCOMM_HARNESS_PORT_ATTEMPTS` (default `5`)
//! - `DIDCOMM_HARNESS_LISTEN_TIMEOUT_MS` (default `2000`)
//! - `DIDCOMM_HARNESS_READINESS_POLL_INTERVAL_MS` (default `10`)
//! - `DIDCOMM_HARNESS_HANDSHAKE_TIMEOUT_MS` (default `20000`)
//! - `DIDCOMM_HARNESS_DB_PATH` (default `./db`)
//! - `DIDCOMM_HARNESS_STORAGE` (`file` or `memory`, default `file`)
//! - `DIDCOMM_HARNESS_TLS_CERT_PATH` (default `fixtures/keys/tls/ec-pubCert.pem`)
//! - `DIDCOMM_HARNESS_EVENT_BUFFER` (default `64`)

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every harness environment variable.
pub const ENV_PREFIX: &str = "DIDCOMM_HARNESS_";

/// Errors returned while loading [`HarnessConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was present but could not be parsed.
    #[error("invalid harness configuration: {0}")]
    Invalid(#[from] envy::Error),
}

/// Where agents keep their protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// One directory per agent under [`HarnessConfig::db_path`].
    #[default]
    File,
    /// Process memory only.
    Memory,
}

/// Tunables for agent provisioning and connection establishment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Tries per random port allocation.
    pub port_attempts: u32,
    /// Readiness deadline per listener, in milliseconds.
    pub listen_timeout_ms: u64,
    /// Sleep between failed readiness dials, in milliseconds.
    pub readiness_poll_interval_ms: u64,
    /// Deadline for each awaited handshake event, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Root directory of persistent agent stores.
    pub db_path: String,
    /// Storage backend for new agents.
    pub storage: StorageKind,
    /// PEM bundle trusted when talking to a remote key server.
    pub tls_cert_path: String,
    /// Capacity of each agent's event and inbound channels.
    pub event_buffer: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            port_attempts: 5,
            listen_timeout_ms: 2_000,
            readiness_poll_interval_ms: 10,
            handshake_timeout_ms: 20_000,
            db_path: "./db".to_owned(),
            storage: StorageKind::File,
            tls_cert_path: "fixtures/keys/tls/ec-pubCert.pem".to_owned(),
            event_buffer: 64,
        }
    }
}

impl HarnessConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }

    /// Loads the configuration from `(name, value)` pairs named as in the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value cannot be parsed.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter(pairs)?)
    }

    /// Readiness deadline per listener.
    #[must_use]
    pub const fn listen_timeout(&self) -> Duration {
        Duration::from_millis(self.listen_timeout_ms)
    }

    /// Sleep between failed readiness dials.
    #[must_use]
    pub const fn readiness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_poll_interval_ms)
    }

    /// Deadline for each awaited handshake event.
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Root directory of persistent agent stores.
    #[must_use]
    pub fn db_root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.db_path)
    }

    /// Trust bundle for remote key servers.
    #[must_use]
    pub fn tls_cert(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.tls_cert_path)
    }

    /// Returns a copy that keeps agent state in memory.
    #[must_use]
    pub const fn in_memory(mut self) -> Self {
        self.storage = StorageKind::Memory;
        self
    }
}
