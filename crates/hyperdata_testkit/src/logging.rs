//! Test logging.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber writing through the test harness.
///
/// Filtered by `RUST_LOG`, defaulting to `warn`. Safe to call from every
/// test; only the first call installs.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
