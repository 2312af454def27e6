//! Tracing setup for processes hosting the binding.

use tracing_subscriber::EnvFilter;

/// Install a JSON `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
