//! Diagnostic logging to stderr.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive, e.g. `twinfold_scan=debug`.
pub const LOG_ENV: &str = "TWINFOLD_LOG";

/// Install the global subscriber.
///
/// `TWINFOLD_LOG` wins when set; otherwise the level follows the number of
/// `-v` flags: warn, info, then debug.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity > 1)
                .without_time(),
        )
        .with(filter)
        .init();
}
