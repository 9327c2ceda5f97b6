//! Logging configuration for t2sql-bench.
//!
//! Logs go to stderr so that stdout carries only command output, which keeps
//! `--json` output machine-readable.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Builds the log filter from `RUST_LOG`, falling back to `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes logging to stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}
