//! Tracing initialisation
//!
//! Diagnostics go to stderr through `tracing`; user-facing status lines
//! are printed by [`crate::console`] and are not affected by the filter.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `match_iterate=debug`
pub const LOG_ENV: &str = "MATCH_ITERATE_LOG";

/// Install the global subscriber. Later calls are ignored.
///
/// `LOG_ENV` wins over `verbose`; otherwise verbose selects `debug` and the
/// default is `warn`.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}
