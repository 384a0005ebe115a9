// src/logging.rs
// =============================================================================
// Operational logging (page loads, retries, per-item failures) goes through
// `tracing` to stderr. The summary the user asked for is printed to stdout,
// so `--json` output stays machine-readable.
//
// Verbosity comes from RUST_LOG, e.g. RUST_LOG=gallery_harvest=debug
// =============================================================================

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

// Installs the global subscriber. Returns false if one was already set.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init();
        assert!(!init());
    }
}
