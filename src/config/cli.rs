//! Command-line options.

use std::path::PathBuf;

use clap::Parser;

use super::types::{LogFormat, LogLevel};

/// Command-line options.
///
/// Logging flags override the `[log]` section of the configuration file when given.
///
/// # Examples
///
/// ```bash
/// # Replay a change-event file into the configured database
/// dcp_sql --config config.toml --events events.jsonl
///
/// # Read events from stdin and resume from a checkpoint file
/// cat events.jsonl | dcp_sql --config config.toml --events - --checkpoint feed.checkpoint
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "dcp_sql",
    about = "Batches change-feed events into SQL statements and flushes them to a database."
)]
pub struct Opt {
    /// Connector configuration file (TOML)
    #[arg(long, value_parser)]
    pub config: PathBuf,

    /// JSON-lines change-event file, or `-` for stdin
    #[arg(long, value_parser, default_value = "-")]
    pub events: PathBuf,

    /// File that persists the committed feed position between runs
    #[arg(long, value_parser)]
    pub checkpoint: Option<PathBuf>,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Log format: plain|json
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Port for the metrics/status server (overrides `status_port`)
    #[arg(long)]
    pub status_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_arguments() {
        let opt = Opt::try_parse_from(["dcp_sql", "--config", "config.toml"]).expect("valid");
        assert_eq!(opt.config, PathBuf::from("config.toml"));
        assert_eq!(opt.events, PathBuf::from("-"));
        assert!(opt.checkpoint.is_none());
        assert!(opt.log_level.is_none());
    }

    #[test]
    fn test_all_arguments() {
        let opt = Opt::try_parse_from([
            "dcp_sql",
            "--config",
            "config.toml",
            "--events",
            "events.jsonl",
            "--checkpoint",
            "feed.checkpoint",
            "--log-level",
            "debug",
            "--log-format",
            "json",
            "--status-port",
            "9090",
        ])
        .expect("valid");
        assert_eq!(opt.events, PathBuf::from("events.jsonl"));
        assert_eq!(opt.checkpoint, Some(PathBuf::from("feed.checkpoint")));
        assert_eq!(opt.log_level, Some(LogLevel::Debug));
        assert_eq!(opt.log_format, Some(LogFormat::Json));
        assert_eq!(opt.status_port, Some(9090));
    }

    #[test]
    fn test_config_is_required() {
        assert!(Opt::try_parse_from(["dcp_sql"]).is_err());
    }
}
