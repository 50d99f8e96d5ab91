//! Logger setup shared by the server and client binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The filter defaults to `<bin_name>=<default_level>` and can be overridden
/// with the `RUST_LOG` environment variable.
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let directive = format!("{}={}", bin_name.replace('-', "_"), default_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    tracing::debug!("Logger initialized (default directive: {})", directive);
}
