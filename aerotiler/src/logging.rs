//! Logging setup
//!
//! Progress goes to stdout as plain lines; errors carry an `Error:` prefix
//! on stderr via the CLI's error path. `RUST_LOG` overrides the default
//! level; `--quiet` drops everything below errors.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// Must be called once, before any other library call. Subsequent calls
/// are ignored (the first subscriber wins), which keeps tests that
/// initialize logging independently from panicking.
pub fn init(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init();
}
