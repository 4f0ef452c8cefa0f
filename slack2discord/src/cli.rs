use std::{fmt, path::PathBuf};

use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory of the Slack export (contains users.json and channels.json)
    pub export_dir: PathBuf,

    /// Exported Slack channels to migrate, in order
    #[arg(value_name = "CHANNEL", required = true)]
    pub channels: Vec<String>,

    /// Discord channel ID receiving the migrated messages
    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    pub discord_channel: Option<String>,

    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// Slack token used to download private files (optional)
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Log what would be sent instead of calling Discord
    #[arg(long)]
    pub dry_run: bool,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_export_dir_and_channels() {
        let args = Args::try_parse_from([
            "s2d",
            "/tmp/export",
            "general",
            "random",
            "--discord-channel",
            "42",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(args.export_dir, PathBuf::from("/tmp/export"));
        assert_eq!(args.channels, vec!["general", "random"]);
        assert_eq!(args.discord_channel.as_deref(), Some("42"));
        assert!(args.dry_run);
        assert!(matches!(args.log_level, LogLevel::Info));
    }

    #[test]
    fn requires_at_least_one_channel() {
        assert!(Args::try_parse_from(["s2d", "/tmp/export"]).is_err());
    }
}
