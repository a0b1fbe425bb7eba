use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

const DEBUG_FILTER: &str = "fintrack_client=debug,fintrack=debug";

/// Installs the stderr log subscriber.
///
/// Logging stays off unless `debug` is set or `RUST_LOG` is present in the
/// environment; `RUST_LOG` always takes precedence over the debug default.
pub fn init(debug: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if debug => EnvFilter::new(DEBUG_FILTER),
        Err(_) => return,
    };

    if let Err(e) = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}
