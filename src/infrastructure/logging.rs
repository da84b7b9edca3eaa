//! Logging configuration
//!
//! Initializes tracing for the application.

/// Initializes logging with the specified level.
///
/// `RUST_LOG` overrides `level`. Returns false if a global subscriber was
/// already installed.
pub fn init_logging(level: &str) -> bool {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
