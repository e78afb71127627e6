//! Subscriber setup for binaries. The library only emits `tracing` events.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERBOSE_FILTER: &str = "notenet=debug";

/// Pick the filter directive: `RUST_LOG` wins, then `-v`, then the configured
/// filter.
pub fn filter_directive(rust_log: Option<&str>, verbose: bool, configured: &str) -> String {
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ if verbose => VERBOSE_FILTER.to_string(),
        _ => configured.to_string(),
    }
}

/// Install a stderr fmt subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init_logging(verbose: bool, configured: &str) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(rust_log.as_deref(), verbose, configured);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
        .with(filter)
        .try_init();
}
