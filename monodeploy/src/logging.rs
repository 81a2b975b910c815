//! Diagnostic tracing for debugging monodeploy.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. The progress lines
//! the CLI prints to stdout are product output and are not affected by it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn`. Compact format on stderr.
///
/// ```bash
/// RUST_LOG=monodeploy=debug monodeploy deploy -s
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
