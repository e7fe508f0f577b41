//! Application services for agent provisioning.

mod composer;
mod lifecycle;
mod port_allocator;
mod readiness;
mod transport_provisioner;

pub use composer::{AgentComposer, ComposeError, ComposeRequest};
pub use lifecycle::{
    AgentLifecycleService, CreateAgentRequest, CreateEdgeAgentRequest, DidResolverSettings,
    ProvisioningError,
};
pub use port_allocator::{PortAllocationError, PortAllocator};
pub use readiness::{ReadinessError, ReadinessProber};
pub use transport_provisioner::{ProvisionedTransports, TransportProvisionError, TransportProvisioner};
