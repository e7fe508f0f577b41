//! Domain model for agent provisioning.
//!
//! Identity, transport bindings, key-management choice and per-agent protocol
//! options live here. Network and storage concerns remain outside this
//! boundary.

mod error;
mod ids;
mod key_management;
mod options;
mod transport;

pub use error::{ParseKeyTypeError, ParseTransportSchemeError, ProvisioningDomainError};
pub use ids::AgentId;
pub use key_management::{KeyManagementChoice, RemoteKmsSettings};
pub use options::{AgentOptions, KeyType, MediaTypeProfile, ProtocolVersion};
pub use transport::{
    InboundRequest, InboundSpec, PortRequest, RETURN_ROUTE_ALL, TransportBinding, TransportScheme,
};
