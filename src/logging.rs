// src/logging.rs

//! Logging setup for `tasktree` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. the `--log-level` CLI flag;
//! 2. the `TASKTREE_LOG` environment variable, which takes full
//!    `EnvFilter` directives (e.g. `"info,tasktree::mediator=trace"`);
//! 3. `info`.
//!
//! Logs go to stderr; stdout is reserved for the bulleted progress output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable read when no level is given on the command line.
pub const LOG_ENV: &str = "TASKTREE_LOG";

/// Initialise global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_becomes_the_whole_filter() {
        assert_eq!(build_filter(Some(LogLevel::Warn)).to_string(), "warn");
        assert_eq!(build_filter(Some(LogLevel::Trace)).to_string(), "trace");
    }
}
