//! Log output for the two executables
//!
//! Everything goes to stderr so the launcher never mixes log lines into the
//! wrapped tool's stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "TOKENUSE_LOG";

/// Install the global subscriber
///
/// `TOKENUSE_LOG` wins over `default_directive` when set. Calling this twice
/// is harmless.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
