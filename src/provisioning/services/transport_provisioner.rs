//! Resolves requested transports into bound addresses and dispatchers.

use super::port_allocator::{PortAllocationError, PortAllocator};
use crate::provisioning::domain::{
    InboundRequest, ParseTransportSchemeError, PortRequest, TransportBinding, TransportScheme,
};
use crate::runtime::adapters::transport::{HttpInbound, HttpOutbound, WsInbound, WsOutbound};
use crate::runtime::ports::{InboundTransport, OutboundTransport};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while provisioning transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportProvisionError {
    /// A scheme other than `http` or `websocket` was requested.
    #[error(transparent)]
    UnsupportedScheme(#[from] ParseTransportSchemeError),

    /// No port could be allocated for a `random` request.
    #[error("port allocation for {scheme} failed: {source}")]
    PortAllocation {
        /// Scheme whose port was being allocated.
        scheme: TransportScheme,
        /// Allocation failure.
        source: PortAllocationError,
    },

    /// The same scheme was requested twice.
    #[error("transport scheme {0} requested more than once")]
    DuplicateScheme(TransportScheme),

    /// Two bindings resolved to the same address.
    #[error("two inbound transports resolve to {0}")]
    DuplicateAddress(String),

    /// An outbound dispatcher could not be built.
    #[error("failed to construct {scheme} outbound transport: {reason}")]
    OutboundConstructionFailed {
        /// Scheme of the dispatcher.
        scheme: TransportScheme,
        /// Failure description.
        reason: String,
    },
}

/// Inbound listeners and outbound dispatchers for one agent.
///
/// Nothing is bound yet; listeners start with the agent runtime.
#[derive(Clone)]
pub struct ProvisionedTransports {
    inbound: Vec<Arc<dyn InboundTransport>>,
    outbound: Vec<Arc<dyn OutboundTransport>>,
}

impl ProvisionedTransports {
    /// Returns the resolved bindings in request order.
    #[must_use]
    pub fn bindings(&self) -> Vec<TransportBinding> {
        self.inbound
            .iter()
            .map(|transport| transport.binding().clone())
            .collect()
    }

    /// Returns the outbound dispatcher names in order.
    #[must_use]
    pub fn outbound_names(&self) -> Vec<&'static str> {
        self.outbound.iter().map(|transport| transport.name()).collect()
    }

    /// Splits into inbound listeners and outbound dispatchers.
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Vec<Arc<dyn InboundTransport>>,
        Vec<Arc<dyn OutboundTransport>>,
    ) {
        (self.inbound, self.outbound)
    }
}

impl std::fmt::Debug for ProvisionedTransports {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProvisionedTransports")
            .field("bindings", &self.bindings())
            .field("outbound", &self.outbound_names())
            .finish()
    }
}

/// Resolves transport requests.
#[derive(Debug, Clone)]
pub struct TransportProvisioner {
    allocator: PortAllocator,
    port_attempts: u32,
}

impl TransportProvisioner {
    /// Creates a provisioner allocating random ports with up to
    /// `port_attempts` tries each.
    #[must_use]
    pub const fn new(allocator: PortAllocator, port_attempts: u32) -> Self {
        Self {
            allocator,
            port_attempts,
        }
    }

    /// Resolves every requested inbound transport and the matching outbound
    /// dispatchers.
    ///
    /// All schemes are validated before any port is allocated. Every scheme
    /// gets a WebSocket dispatcher, and HTTP additionally gets an HTTP one, so
    /// peers can be answered over either transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportProvisionError`] for unsupported or duplicate
    /// schemes, exhausted port allocation, colliding addresses and
    /// dispatcher construction failures.
    pub fn resolve(
        &self,
        request: &InboundRequest,
    ) -> Result<ProvisionedTransports, TransportProvisionError> {
        let schemes = request
            .specs()
            .iter()
            .map(|spec| TransportScheme::try_from(spec.scheme()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen_schemes = HashSet::new();
        if let Some(duplicate) = schemes.iter().find(|scheme| !seen_schemes.insert(**scheme)) {
            return Err(TransportProvisionError::DuplicateScheme(*duplicate));
        }

        let mut addresses = HashSet::new();
        let mut inbound: Vec<Arc<dyn InboundTransport>> = Vec::with_capacity(schemes.len());
        for (spec, scheme) in request.specs().iter().zip(&schemes) {
            let port = match spec.port() {
                PortRequest::Fixed(port) => port,
                PortRequest::Random => self.allocate_distinct(*scheme, spec.host(), &addresses)?,
            };
            let binding = TransportBinding::new(*scheme, spec.host(), port);
            if !addresses.insert(binding.address()) {
                return Err(TransportProvisionError::DuplicateAddress(binding.address()));
            }

            tracing::debug!(
                scheme = %scheme,
                address = %binding.address(),
                url = %binding.advertised_url(),
                "inbound transport resolved"
            );
            let listener: Arc<dyn InboundTransport> = match scheme {
                TransportScheme::Http => Arc::new(HttpInbound::new(binding)),
                TransportScheme::WebSocket => Arc::new(WsInbound::new(binding)) as Arc<_>,
            };
            inbound.push(listener);
        }

        Ok(ProvisionedTransports {
            inbound,
            outbound: self.outbound_for(&schemes)?,
        })
    }

    /// Resolves a comma-separated scheme list into outbound dispatchers only,
    /// as used by edge agents.
    ///
    /// # Errors
    ///
    /// Returns [`TransportProvisionError::UnsupportedScheme`] for unknown
    /// schemes and [`TransportProvisionError::OutboundConstructionFailed`]
    /// when a dispatcher cannot be built.
    pub fn resolve_outbound_only(
        &self,
        schemes: &str,
    ) -> Result<ProvisionedTransports, TransportProvisionError> {
        let parsed = schemes
            .split(',')
            .map(TransportScheme::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProvisionedTransports {
            inbound: Vec::new(),
            outbound: self.outbound_for(&parsed)?,
        })
    }

    /// Builds the outbound dispatchers for `schemes` without any listener.
    ///
    /// # Errors
    ///
    /// Returns [`TransportProvisionError::OutboundConstructionFailed`] when
    /// the HTTP client cannot be built.
    pub fn outbound_for(
        &self,
        schemes: &[TransportScheme],
    ) -> Result<Vec<Arc<dyn OutboundTransport>>, TransportProvisionError> {
        let mut outbound: Vec<Arc<dyn OutboundTransport>> = Vec::new();
        let mut names = HashSet::new();
        for scheme in schemes {
            if names.insert("websocket") {
                outbound.push(Arc::new(WsOutbound::new()));
            }
            if *scheme == TransportScheme::Http && names.insert("http") {
                let client = reqwest::Client::builder().build().map_err(|err| {
                    TransportProvisionError::OutboundConstructionFailed {
                        scheme: *scheme,
                        reason: err.to_string(),
                    }
                })?;
                outbound.push(Arc::new(HttpOutbound::new(client)));
            }
        }
        Ok(outbound)
    }

    fn allocate_distinct(
        &self,
        scheme: TransportScheme,
        host: &str,
        taken: &HashSet<String>,
    ) -> Result<u16, TransportProvisionError> {
        self.allocator
            .allocate_where(self.port_attempts, |port| {
                !taken.contains(&format!("{host}:{port}"))
            })
            .map_err(|source| TransportProvisionError::PortAllocation { scheme, source })
    }
}
