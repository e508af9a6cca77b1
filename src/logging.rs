//! Development-time tracing.
//!
//! - **Tracing (this module)**: diagnostics via `RUST_LOG`, written to stderr.
//! - **Console (`console`)**: the run's product output on stdout. Unaffected
//!   by `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn`. `verbose` raises the default to
/// `moby=debug` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=moby=debug moby run
/// ```
pub fn init(verbose: bool) {
    let default = if verbose { "moby=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed (e.g. by an embedding test).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
