//! Ephemeral port discovery port.

/// Asks the operating system for a free TCP port.
#[cfg_attr(test, mockall::automock)]
pub trait PortBinder: Send + Sync {
    /// Binds a listener to an OS-assigned port, reads the port back and
    /// releases the listener before returning.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from binding, reading the local address or
    /// closing the listener.
    fn bind_ephemeral(&self) -> std::io::Result<u16>;
}
