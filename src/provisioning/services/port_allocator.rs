//! Bounded-retry ephemeral port allocation.

use crate::provisioning::ports::PortBinder;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`PortAllocator`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortAllocationError {
    /// Every attempt failed.
    #[error("no free port after {attempts} attempts: {last_error}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Description of the last failure.
        last_error: String,
    },
}

/// Finds free TCP ports through a [`PortBinder`].
///
/// A returned port is only a best-effort reservation: it was free when the
/// binder released it, and a concurrent process may take it before the
/// caller binds. Callers surface such late bind failures rather than falling
/// back to a fixed port.
#[derive(Clone)]
pub struct PortAllocator {
    binder: Arc<dyn PortBinder>,
}

impl PortAllocator {
    /// Creates an allocator over `binder`.
    #[must_use]
    pub fn new(binder: Arc<dyn PortBinder>) -> Self {
        Self { binder }
    }

    /// Returns a free port, trying at most `max_attempts` times.
    ///
    /// # Errors
    ///
    /// Returns [`PortAllocationError::Exhausted`] after `max_attempts` failed
    /// attempts, including when `max_attempts` is zero.
    pub fn allocate(&self, max_attempts: u32) -> Result<u16, PortAllocationError> {
        self.allocate_where(max_attempts, |_| true)
    }

    /// Returns a free port accepted by `accept`, trying at most
    /// `max_attempts` times in total.
    ///
    /// A port rejected by `accept` uses up an attempt like a bind failure.
    ///
    /// # Errors
    ///
    /// Returns [`PortAllocationError::Exhausted`] after `max_attempts` failed
    /// or rejected attempts, including when `max_attempts` is zero.
    pub fn allocate_where(
        &self,
        max_attempts: u32,
        accept: impl Fn(u16) -> bool,
    ) -> Result<u16, PortAllocationError> {
        let mut last_error = String::from("no attempt made");
        for attempt in 1..=max_attempts {
            match self.binder.bind_ephemeral() {
                Ok(0) => last_error = String::from("binder returned port 0"),
                Ok(port) if accept(port) => return Ok(port),
                Ok(port) => last_error = format!("port {port} is already taken"),
                Err(err) => last_error = err.to_string(),
            }
            tracing::debug!(attempt, max_attempts, error = %last_error, "port allocation attempt failed");
        }
        Err(PortAllocationError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

impl std::fmt::Debug for PortAllocator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("PortAllocator").finish_non_exhaustive()
    }
}
