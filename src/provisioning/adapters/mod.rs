//! Adapter implementations for provisioning ports.

mod loopback;

pub use loopback::LoopbackPortBinder;
