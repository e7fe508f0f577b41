//! Port binder backed by a throwaway loopback listener.

use crate::provisioning::ports::PortBinder;
use std::net::{Ipv4Addr, TcpListener};

/// Discovers free ports by binding `127.0.0.1:0`.
///
/// The port is released before it is returned, so another process may claim
/// it before the caller binds it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackPortBinder;

impl LoopbackPortBinder {
    /// Creates the binder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PortBinder for LoopbackPortBinder {
    fn bind_ephemeral(&self) -> std::io::Result<u16> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
        let port = listener.local_addr()?.port();
        drop(listener);
        Ok(port)
    }
}
