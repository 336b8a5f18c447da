//! Tracing setup for the daemon and test harnesses.
//!
//! The per-category toggles in [`LoggingConfig`](crate::config::LoggingConfig)
//! gate individual call sites; this module only installs the subscriber that
//! renders whatever those sites emit.

use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset: chatty strand crates at `info`,
/// everything else at `warn`.
const DEFAULT_DIRECTIVES: &str =
    "warn,strand_node=info,strand_network=info,strand_consensus=info";

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// directives. Calling this twice is an error in `tracing`, so the daemon
/// does it exactly once before any subsystem starts.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
