//! Tracing subscriber installation.

use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when the variable is unset or invalid.
///
/// Returns `false` when a global subscriber was already installed, which
/// makes repeated calls from tests harmless.
#[must_use]
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn second_installation_is_refused() {
        let _first = init_tracing("didcomm_harness=debug");

        assert!(!init_tracing("info"));
    }
}
