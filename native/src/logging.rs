//! Diagnostics for the native module. Output goes to stderr so it never mixes
//! with anything the host writes to stdout.

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive; wins over the config.
pub const LOG_ENV: &str = "JOINLY_NATIVE_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs the fmt subscriber once. Returns `false` when a global subscriber
/// was already set, either by an earlier call or by the host.
pub fn init_logging(configured: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_DIRECTIVE)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok()
}
