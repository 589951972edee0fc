// src/logging.rs

//! Process-wide tracing setup.
//!
//! The subscriber writes to stderr so stdout stays clean for `--dry-run`
//! output. Level selection: the `--log-level` flag wins, then the
//! `WATCHMILL_LOG` environment variable (full `EnvFilter` directive syntax
//! works there), then `info`.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "WATCHMILL_LOG";

/// Install the global subscriber. Call once, before the Filer starts.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => {
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
        }
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
