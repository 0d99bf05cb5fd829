//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber from the indexer's logging settings.
///
/// `level` is the default filter directive ("trace" through "error") used
/// when `RUST_LOG` is not set; `RUST_LOG` always wins so operators can
/// raise verbosity per module without touching the config file. `format`
/// selects `"json"` (one event per line, for log shippers) or
/// human-readable output.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
