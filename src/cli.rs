// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::loader::default_config_path;

/// Command-line arguments for `pbspipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pbspipe",
    version,
    about = "Drive a staged calibration pipeline over data partitions on a PBS cluster.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Pipeline.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PBSPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the plan and generated scripts, submit nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip every step before the one containing this stage.
    #[arg(long, value_name = "STAGE")]
    pub from_stage: Option<String>,

    /// Log to stderr only; do not create a timestamped log file.
    #[arg(long)]
    pub no_log_file: bool,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["pbspipe"]);
        assert_eq!(args.config, PathBuf::from("Pipeline.toml"));
        assert!(!args.dry_run);
        assert!(!args.no_log_file);
        assert!(args.from_stage.is_none());
        assert!(args.log_level.is_none());
    }

    #[test]
    fn all_flags() {
        let args = CliArgs::parse_from([
            "pbspipe",
            "--config",
            "obs/rcs.toml",
            "--log-level",
            "debug",
            "--dry-run",
            "--from-stage",
            "apply_cal",
            "--no-log-file",
        ]);
        assert_eq!(args.config, PathBuf::from("obs/rcs.toml"));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.dry_run);
        assert_eq!(args.from_stage.as_deref(), Some("apply_cal"));
        assert!(args.no_log_file);
    }
}
