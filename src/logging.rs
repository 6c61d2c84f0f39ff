//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`. The move journal is written
//! separately by [`crate::journal`] and is not affected by the filter here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "declutter=warn";
const VERBOSE_LOG_FILTER: &str = "declutter=debug";

/// Returns the filter to use; `RUST_LOG` wins when it is set and valid.
pub fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        })
    })
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbose: bool) {
    let _ = tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
