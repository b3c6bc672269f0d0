//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Stream Aligner - multi-source timestamp alignment
#[derive(Parser, Debug)]
#[command(
    name = "stream-aligner",
    author,
    version,
    about = "Align timestamped frames from several sources against a base source",
    long_about = "Buffers frames from several independent sources, matches every base \n\
                  frame to the nearest frame of each other source, and writes the \n\
                  aligned tuples to a JSON log on shutdown."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "STREAM_ALIGNER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "STREAM_ALIGNER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run producers and the coordinator
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Summarize a persisted synced log
    Inspect(InspectArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "aligner.toml",
        env = "STREAM_ALIGNER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override sync.max_skew_seconds
    #[arg(long, env = "STREAM_ALIGNER_MAX_SKEW")]
    pub max_skew: Option<f64>,

    /// Override sync.polling_interval_seconds
    #[arg(long, env = "STREAM_ALIGNER_POLLING_INTERVAL")]
    pub polling_interval: Option<f64>,

    /// Override output.synced_log_path
    #[arg(short, long, env = "STREAM_ALIGNER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override output.snapshot_dir
    #[arg(long, env = "STREAM_ALIGNER_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Stop after this many aligned tuples (0 = unlimited)
    #[arg(long, default_value = "0", env = "STREAM_ALIGNER_MAX_TUPLES")]
    pub max_tuples: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "STREAM_ALIGNER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "STREAM_ALIGNER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "aligner.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "aligner.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-source generator and replay settings
    #[arg(long)]
    pub sources: bool,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Synced log written by `run`
    #[arg(default_value = "synced_data.json")]
    pub log: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_overrides_parse() {
        let cli = Cli::try_parse_from([
            "stream-aligner",
            "run",
            "--config",
            "a.toml",
            "--max-skew",
            "0.1",
            "--max-tuples",
            "5",
            "-o",
            "out.json",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("a.toml"));
        assert_eq!(args.max_skew, Some(0.1));
        assert_eq!(args.max_tuples, 5);
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert_eq!(args.timeout, 0);
    }

    #[test]
    fn test_inspect_defaults() {
        let cli = Cli::try_parse_from(["stream-aligner", "inspect"]).unwrap();
        let Commands::Inspect(args) = cli.command else {
            panic!("expected inspect command");
        };
        assert_eq!(args.log, PathBuf::from("synced_data.json"));
        assert!(!args.json);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["stream-aligner", "-q", "-v", "info"]).is_err());
    }
}
