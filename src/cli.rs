// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdrelay`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdrelay",
    version,
    about = "Run a command through the serialized execution queue.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the settings file (TOML).
    ///
    /// Default: `Cmdrelay.toml` in the current working directory; a missing
    /// file falls back to built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Cmdrelay.toml")]
    pub config: String,

    /// Working directory for the command (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,

    /// Use the streaming strategy (direct exec, no shell) instead of the
    /// buffered shell strategy.
    #[arg(long)]
    pub spawn: bool,

    /// Stream stderr chunks as progress lines (streaming strategy only).
    #[arg(long)]
    pub progress: bool,

    /// Timeout in seconds, or "false" to disable.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDRELAY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to run.
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Arguments passed to the command.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
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
