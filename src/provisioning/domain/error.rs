//! Error types for provisioning domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing provisioning domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisioningDomainError {
    /// The agent identity is empty after trimming.
    #[error("agent identity must not be empty")]
    EmptyAgentId,

    /// The agent identity contains a list separator or whitespace.
    #[error("agent identity '{0}' must not contain commas or whitespace")]
    InvalidAgentId(String),

    /// A port token is neither `random` nor a valid TCP port.
    #[error("invalid inbound port '{0}' (expected 'random' or 1-65535)")]
    InvalidPort(String),

    /// A bind host is empty after trimming.
    #[error("inbound host must not be empty")]
    EmptyHost,

    /// Scheme, host and port lists have different lengths.
    #[error(
        "inbound lists must have equal length (schemes: {schemes}, hosts: {hosts}, ports: {ports})"
    )]
    MismatchedInboundLists {
        /// Number of schemes supplied.
        schemes: usize,
        /// Number of hosts supplied.
        hosts: usize,
        /// Number of ports supplied.
        ports: usize,
    },

    /// A media type profile is empty after trimming.
    #[error("media type profile must not be empty")]
    EmptyMediaTypeProfile,

    /// The transport return-route option is not supported.
    #[error("only 'all' transport route return option is supported, got '{0}'")]
    UnsupportedReturnRoute(String),

    /// A remote key server URL is empty or lacks an HTTP(S) prefix.
    #[error("key server URL '{0}' must start with 'http://' or 'https://'")]
    InvalidKeyServerUrl(String),

    /// The remote keystore controller is empty.
    #[error("keystore controller must not be empty")]
    EmptyController,
}

/// Error returned when a transport scheme is not `http` or `websocket`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid transport provider type: {0} (only websocket/http is supported)")]
pub struct ParseTransportSchemeError(pub String);

/// Error returned when a key type name is unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown key type: {0}")]
pub struct ParseKeyTypeError(pub String);
