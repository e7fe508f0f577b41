//! Deadline-bounded TCP readiness polling.

use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Errors returned by [`ReadinessProber`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadinessError {
    /// The address did not accept a connection before the deadline.
    #[error("{address} not reachable within {timeout:?}")]
    Timeout {
        /// Address probed.
        address: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },
}

/// Dials an address until it accepts a connection or a deadline passes.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProber {
    poll_interval: Duration,
}

impl ReadinessProber {
    /// Creates a prober sleeping `poll_interval` between failed dials.
    #[must_use]
    pub const fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Returns once `address` accepts a TCP connection.
    ///
    /// Each accepted connection is closed immediately. Individual dials are
    /// cut off at the deadline, so the call never outlives `timeout` by more
    /// than scheduling jitter.
    ///
    /// # Errors
    ///
    /// Returns [`ReadinessError::Timeout`] when the deadline passes first.
    pub async fn wait_until_reachable(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<(), ReadinessError> {
        let deadline = Instant::now() + timeout;
        let timed_out = || ReadinessError::Timeout {
            address: address.to_owned(),
            timeout,
        };

        loop {
            match tokio::time::timeout_at(deadline, TcpStream::connect(address)).await {
                Ok(Ok(stream)) => {
                    drop(stream);
                    tracing::debug!(address, "listener reachable");
                    return Ok(());
                }
                Ok(Err(_refused)) => {}
                Err(_elapsed) => return Err(timed_out()),
            }

            let next_attempt = Instant::now() + self.poll_interval;
            if next_attempt >= deadline {
                tokio::time::sleep_until(deadline).await;
                return Err(timed_out());
            }
            tokio::time::sleep_until(next_attempt).await;
        }
    }
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}
