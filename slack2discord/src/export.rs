//! Reading the per-channel message files of a Slack export.
//!
//! ```text
//! <export>/
//! ├── users.json
//! ├── channels.json
//! └── <channel>/
//!     ├── 2020-04-10.json    # one array of messages per day
//!     └── 2020-04-11.json
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::error::MigrateError;
use crate::models::{slack::ExportedMessage, Record};

/// Check that the export directory and every requested channel directory exist.
pub fn validate_layout(dir: &Path, channels: &[String]) -> Result<(), MigrateError> {
    if !dir.is_dir() {
        return Err(MigrateError::ExportDirMissing(dir.to_path_buf()));
    }

    let missing: Vec<String> = channels
        .iter()
        .filter(|channel| !dir.join(channel).is_dir())
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(MigrateError::ChannelsMissing(missing));
    }

    Ok(())
}

/// All `.json` files of the given channels, channel by channel, sorted by name within a channel.
pub fn record_file_paths(dir: &Path, channels: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    for channel in channels {
        let channel_dir = dir.join(channel);
        let entries = match fs::read_dir(&channel_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot list channel {channel}: {e}");
                continue;
            }
        };

        let mut channel_paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        channel_paths.sort();

        debug!("found {} files in channel {channel}", channel_paths.len());
        paths.extend(channel_paths);
    }

    paths
}

/// Read every record of every file. Unreadable files and defective records are
/// skipped with a warning.
pub fn read_records(paths: &[PathBuf]) -> Vec<Record> {
    let mut records = Vec::new();

    for path in paths {
        match read_record_file(path) {
            Ok(file_records) => records.extend(file_records),
            Err(e) => warn!("skipping {}: {:#}", path.display(), e),
        }
    }

    records
}

fn read_record_file(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path).context("failed to read file")?;
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&content).context("file is not a JSON array of messages")?;

    let mut records = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ExportedMessage>(value)
            .map_err(anyhow::Error::from)
            .and_then(|message| message.into_record(path).map_err(anyhow::Error::from));

        match parsed {
            Ok(record) => records.push(record),
            Err(e) => warn!("{}: message #{index} skipped: {e}", path.display()),
        }
    }

    Ok(records)
}
