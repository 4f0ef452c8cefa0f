use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::cli::Args;

// Discord caps a message at 2000 chars; 200 are left for the author and date header.
const TEXT_LIMIT: usize = 2000 - 200;
// Discord allows roughly 10,000 messages per 10 minutes.
const THROTTLE_MILLIS: u64 = 300;
const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const FILE_DOWNLOAD_TIMEOUT_SECS: u64 = 60;
const THREAD_NAME_LEN: usize = 20;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub discord_token: Option<String>,
    pub discord_channel: Option<String>,
    pub slack_token: Option<String>,
    pub throttle_ms: Option<u64>,
    pub text_limit: Option<usize>,
    pub max_file_size_bytes: Option<u64>,
    pub download_timeout_secs: Option<u64>,
    pub thread_name_len: Option<usize>,
}

/// Tuning knobs of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Pause after every delivered root and reply.
    pub throttle: Duration,
    /// Per-message character budget for the message body.
    pub text_limit: usize,
    pub max_file_size: u64,
    pub download_timeout: Duration,
    pub thread_name_len: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            throttle: Duration::from_millis(THROTTLE_MILLIS),
            text_limit: TEXT_LIMIT,
            max_file_size: MAX_FILE_SIZE_BYTES,
            download_timeout: Duration::from_secs(FILE_DOWNLOAD_TIMEOUT_SECS),
            thread_name_len: THREAD_NAME_LEN,
        }
    }
}

impl Settings {
    pub fn migration_config(&self) -> MigrationConfig {
        let defaults = MigrationConfig::default();
        MigrationConfig {
            throttle: self
                .throttle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.throttle),
            text_limit: self
                .text_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.text_limit),
            max_file_size: self.max_file_size_bytes.unwrap_or(defaults.max_file_size),
            download_timeout: self
                .download_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            thread_name_len: self
                .thread_name_len
                .filter(|len| *len > 0)
                .unwrap_or(defaults.thread_name_len),
        }
    }
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

// Function to get the XDG_CONFIG_HOME path
fn get_xdg_config_path() -> Option<PathBuf> {
    // First check XDG_CONFIG_HOME environment variable
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    // If XDG_CONFIG_HOME is not set, fall back to $HOME/.config
    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

pub fn load_settings() -> anyhow::Result<Settings> {
    match get_xdg_config_path() {
        Some(xdg_config) => load_settings_from(&xdg_config.join(CONFIG_FILE_NAME).join("config.toml")),
        None => Ok(Settings::default()),
    }
}

pub fn load_settings_from(config_path: &Path) -> anyhow::Result<Settings> {
    if !config_path.exists() {
        return Ok(Settings::default());
    }

    Config::builder()
        .add_source(File::from(config_path.to_path_buf()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

pub fn merge_settings_with_args(args: &Args, settings: &Settings) -> Args {
    let mut new_args = args.clone();

    // Apply config values to args if they're not already set by CLI
    macro_rules! apply_if_unset {
        ($args:expr, $field:ident, $config:expr) => {
            if $args.$field.as_deref().map_or(true, str::is_empty) {
                if let Some(value) = &$config.$field {
                    $args.$field = Some(value.clone());
                }
            }
        };
    }

    apply_if_unset!(new_args, discord_token, settings);
    apply_if_unset!(new_args, discord_channel, settings);
    apply_if_unset!(new_args, slack_token, settings);

    debug!(
        "merged config: channels={:?} discord_channel={:?} dry_run={}",
        new_args.channels, new_args.discord_channel, new_args.dry_run
    );

    new_args
}
