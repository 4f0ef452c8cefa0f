use std::path::PathBuf;

use thiserror::Error;

use crate::models::Timestamp;

/// Failures detected before delivery starts. Each one aborts the run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Directory {} does not exist! Use a valid path.", .0.display())]
    ExportDirMissing(PathBuf),

    #[error("The following channels do not exist: {}. Ensure all channels provided", .0.join(", "))]
    ChannelsMissing(Vec<String>),

    #[error("Users don't seem right. Check users.json in your directory")]
    InvalidUsers,

    #[error("Channels don't seem right. Check channels.json in your directory")]
    InvalidChannels,

    #[error("There aren't any valid files in the channels you mentioned.")]
    NoRecordFiles,

    #[error(
        "Two messages share timestamp {timestamp} ({} and {})",
        .first.display(),
        .second.display()
    )]
    DuplicateTimestamp {
        timestamp: Timestamp,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Missing {0}. Pass it on the command line or use --dry-run")]
    MissingDestination(&'static str),
}

/// A single exported message that cannot be migrated.
#[derive(Debug, Error, PartialEq)]
pub enum RecordDefect {
    #[error("timestamp missing")]
    MissingTimestamp,

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("username and files missing")]
    MissingAuthor,
}

/// A file that could not be fetched from the export.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download returned status {0}")]
    Status(u16),

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl FetchError {
    /// Short note appended to the Discord message the file belonged to.
    pub fn note(&self) -> &'static str {
        match self {
            FetchError::TooLarge { .. } => "file too big",
            FetchError::Status(_) | FetchError::Request(_) => "file download failed",
        }
    }
}
