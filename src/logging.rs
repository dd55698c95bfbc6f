//! Developer tracing for the engine's bookkeeping.
//!
//! Step headers and misuse warnings go to the console through the printer
//! regardless of this setup. Tracing output carries the internal detail
//! (run records, queue positions, hook failures) and goes to stderr.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Returns `false` if a global subscriber was already installed.
///
/// ```bash
/// RUST_LOG=devlog=debug cargo run --example nested_steps
/// ```
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .is_ok()
}
