//! Tracing setup for the CLI. Logs go to stderr so tables on stdout stay
//! clean for piping.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Read before falling back to the `-v` count.
pub const LOG_ENV: &str = "BUDDY_LOG";

fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
