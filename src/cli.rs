// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `tasktree`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tasktree",
    version,
    about = "Inspect and replay task tree message logs.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKTREE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Path to the settings file (TOML).
    ///
    /// Default: `Tasktree.toml` in the current working directory; missing
    /// files fall back to default settings.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Replay a JSON-lines message log through the bulleted console.
    Replay {
        /// Log file written by the JSON-lines sink.
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Disable ANSI colours regardless of settings.
        #[arg(long)]
        no_color: bool,
    },
    /// Parse + validate the settings file and print the result.
    CheckConfig,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
