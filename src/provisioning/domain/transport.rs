//! Transport scheme, port request and binding value objects.

use super::{ParseTransportSchemeError, ProvisioningDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The only transport return-route option supported by edge agents.
pub const RETURN_ROUTE_ALL: &str = "all";

/// Port token that requests an ephemeral port.
const RANDOM_PORT_TOKEN: &str = "random";

/// Inbound transport schemes an agent can listen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportScheme {
    /// DIDComm over HTTP POST.
    Http,
    /// DIDComm over WebSocket frames.
    #[serde(rename = "websocket")]
    WebSocket,
}

impl TransportScheme {
    /// Returns the canonical scheme name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::WebSocket => "websocket",
        }
    }

    /// Returns the URL prefix advertised to peers.
    #[must_use]
    pub const fn url_prefix(self) -> &'static str {
        match self {
            Self::Http => "http://",
            Self::WebSocket => "ws://",
        }
    }
}

impl fmt::Display for TransportScheme {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TransportScheme {
    type Error = ParseTransportSchemeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "websocket" => Ok(Self::WebSocket),
            _ => Err(ParseTransportSchemeError(value.trim().to_owned())),
        }
    }
}

/// Requested inbound port: a literal port or any free ephemeral port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortRequest {
    /// Allocate a free port before the listener starts.
    Random,
    /// Use exactly this port.
    Fixed(u16),
}

impl TryFrom<&str> for PortRequest {
    type Error = ProvisioningDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let token = value.trim();
        if token.eq_ignore_ascii_case(RANDOM_PORT_TOKEN) {
            return Ok(Self::Random);
        }

        match token.parse::<u16>() {
            Ok(0) => Ok(Self::Random),
            Ok(port) => Ok(Self::Fixed(port)),
            Err(_) => Err(ProvisioningDomainError::InvalidPort(token.to_owned())),
        }
    }
}

/// One requested inbound listener before its scheme is validated.
///
/// The scheme stays a raw token here: validating it is the transport
/// provisioner's job, so that an unsupported scheme is reported by the step
/// that owns transport construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSpec {
    scheme: String,
    host: String,
    port: PortRequest,
}

impl InboundSpec {
    /// Creates an inbound listener request.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError::EmptyHost`] when `host` is empty.
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        port: PortRequest,
    ) -> Result<Self, ProvisioningDomainError> {
        let normalized_host = host.into().trim().to_owned();
        if normalized_host.is_empty() {
            return Err(ProvisioningDomainError::EmptyHost);
        }

        Ok(Self {
            scheme: scheme.into().trim().to_ascii_lowercase(),
            host: normalized_host,
            port,
        })
    }

    /// Returns the raw scheme token.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the requested port.
    #[must_use]
    pub const fn port(&self) -> PortRequest {
        self.port
    }
}

/// Ordered list of inbound listener requests for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InboundRequest {
    specs: Vec<InboundSpec>,
}

impl InboundRequest {
    /// Creates a request from already-built listener specs.
    #[must_use]
    pub const fn new(specs: Vec<InboundSpec>) -> Self {
        Self { specs }
    }

    /// Creates a request for a single listener on a random port.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError::EmptyHost`] when `host` is empty.
    pub fn single_random(
        scheme: impl Into<String>,
        host: impl Into<String>,
    ) -> Result<Self, ProvisioningDomainError> {
        Ok(Self::new(vec![InboundSpec::new(
            scheme,
            host,
            PortRequest::Random,
        )?]))
    }

    /// Parses parallel comma-separated scheme, host and port lists.
    ///
    /// `parse("http,websocket", "localhost,localhost", "random,9090")`
    /// yields two listener specs.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningDomainError::MismatchedInboundLists`] when the
    /// lists differ in length, or the first host/port validation error.
    pub fn parse(schemes: &str, hosts: &str, ports: &str) -> Result<Self, ProvisioningDomainError> {
        let scheme_tokens: Vec<&str> = schemes.split(',').collect();
        let host_tokens: Vec<&str> = hosts.split(',').collect();
        let port_tokens: Vec<&str> = ports.split(',').collect();

        if scheme_tokens.len() != host_tokens.len() || scheme_tokens.len() != port_tokens.len() {
            return Err(ProvisioningDomainError::MismatchedInboundLists {
                schemes: scheme_tokens.len(),
                hosts: host_tokens.len(),
                ports: port_tokens.len(),
            });
        }

        let specs = scheme_tokens
            .into_iter()
            .zip(host_tokens)
            .zip(port_tokens)
            .map(|((scheme, host), port)| InboundSpec::new(scheme, host, PortRequest::try_from(port)?))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { specs })
    }

    /// Returns the listener specs in request order.
    #[must_use]
    pub fn specs(&self) -> &[InboundSpec] {
        &self.specs
    }

    /// Returns whether no listeners were requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// A resolved inbound listener: scheme, bind host and concrete port.
///
/// The port is fixed at construction; a binding never re-resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportBinding {
    scheme: TransportScheme,
    host: String,
    port: u16,
}

impl TransportBinding {
    /// Creates a resolved binding.
    #[must_use]
    pub fn new(scheme: TransportScheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// Returns the transport scheme.
    #[must_use]
    pub const fn scheme(&self) -> TransportScheme {
        self.scheme
    }

    /// Returns the bind host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the resolved port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the URL peers use to reach this listener.
    #[must_use]
    pub fn advertised_url(&self) -> String {
        format!("{}{}", self.scheme.url_prefix(), self.address())
    }
}
