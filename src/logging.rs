//! Logging setup.
//!
//! A single `tracing_subscriber::fmt` subscriber is installed at startup and
//! lives for the rest of the process. Lines carry a timestamp, the level and
//! the message, and go to stderr. `RUST_LOG` wins over the CLI verbosity.

use crate::error::{MaskError, Result};
use tracing_subscriber::EnvFilter;

/// Filter directive for the given CLI verbosity.
pub fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| MaskError::LoggingInit(e.to_string()))
}
