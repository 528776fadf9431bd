//! Logging configuration for tickit-report.
//!
//! Diagnostics go to stderr so that the report itself (stdout) can be piped
//! or captured without interleaved log lines.

use tracing_subscriber::EnvFilter;

/// Returns the default filter directive for the given verbosity.
pub fn default_directive(quiet: bool, verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initializes logging to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity flags when it is set.
pub fn init_stderr_logging(quiet: bool, verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
