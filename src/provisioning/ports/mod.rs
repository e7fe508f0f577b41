//! Port contracts for provisioning.

mod port_binder;

pub use port_binder::PortBinder;

#[cfg(test)]
pub use port_binder::MockPortBinder;
