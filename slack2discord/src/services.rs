use crate::api::discord::{DiscordApi, DiscordClient};
use crate::api::dry_run::DryRunClient;
use crate::api::files::{FileFetcher, HttpFileFetcher};
use crate::cli::Args;
use crate::error::MigrateError;
use crate::format::TextFormatter;
use crate::models::discord::{Attachment, MessageHandle};
use crate::models::SlackFile;
use crate::pins::PinIndex;
use crate::settings::{self, merge_settings_with_args, MigrationConfig};
use crate::threads::{Thread, ThreadDirectory};
use crate::{export, identity, pins};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use rand::{distr::Alphanumeric, Rng};
use std::fmt;
use tokio::time::sleep;

const DRY_RUN_CHANNEL: &str = "dry-run";
const COMPLETION_MESSAGE: &str = "[slack2discord] Migration complete!";

pub async fn run(args: Args) -> Result<()> {
    let settings = settings::load_settings().context("Failed to load settings")?;
    let args = merge_settings_with_args(&args, &settings);
    let config = settings.migration_config();

    let discord: Box<dyn DiscordApi> = if args.dry_run {
        Box::new(DryRunClient::new())
    } else {
        let token = args
            .discord_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(MigrateError::MissingDestination("Discord token"))?;
        Box::new(DiscordClient::new(token)?)
    };

    let channel_id = match args.discord_channel.as_deref() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ if args.dry_run => DRY_RUN_CHANNEL.to_string(),
        _ => return Err(MigrateError::MissingDestination("Discord channel id").into()),
    };

    let directory = load_directory(&args, &config)?;
    let pins = pins::load_pinned(&args.export_dir, &args.channels).unwrap_or_else(|| {
        warn!("Could not read pins from channels.json, nothing will be pinned");
        PinIndex::default()
    });
    info!(
        "{} messages loaded, {} pinned",
        directory.len(),
        pins.len()
    );

    let fetcher = HttpFileFetcher::new(
        args.slack_token.as_deref(),
        config.download_timeout,
        config.max_file_size,
    )?;

    let progress = ProgressBar::new(0);
    progress.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}",
    )?);

    let report = Migrator::new(discord.as_ref(), &fetcher, &pins, &config)
        .with_progress(progress)
        .migrate(&directory, &channel_id)
        .await;

    info!("{report}");
    if let Err(e) = discord.send_message(&channel_id, COMPLETION_MESSAGE).await {
        warn!("Could not post completion message - {e:#}");
    }
    println!("Migration complete!");

    Ok(())
}

/// Validate the export and rebuild its threads. Every failure here happens
/// before anything is sent.
pub fn load_directory(args: &Args, config: &MigrationConfig) -> Result<ThreadDirectory> {
    export::validate_layout(&args.export_dir, &args.channels)?;

    let users = identity::load_users(&args.export_dir)
        .filter(|users| !users.is_empty())
        .ok_or(MigrateError::InvalidUsers)?;

    let channels = identity::load_channels(&args.export_dir)
        .filter(|channels| !channels.is_empty())
        .ok_or(MigrateError::InvalidChannels)?;

    let paths = export::record_file_paths(&args.export_dir, &args.channels);
    if paths.is_empty() {
        return Err(MigrateError::NoRecordFiles.into());
    }

    let formatter = TextFormatter::new(&users, &channels)?;
    let records = export::read_records(&paths);
    let directory = ThreadDirectory::build(records, &users, &formatter, config.text_limit)?;

    Ok(directory)
}

/// What happened during a migration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub roots_sent: usize,
    pub replies_sent: usize,
    pub failed_messages: usize,
    pub failed_pins: usize,
    pub failed_files: usize,
    pub failed_uploads: usize,
    pub failed_threads: usize,
    /// Replies skipped because their root never made it to Discord.
    pub orphaned_replies: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} messages and {} replies migrated; failures: {} messages, {} pins, {} files, {} uploads, {} threads; {} replies orphaned",
            self.roots_sent,
            self.replies_sent,
            self.failed_messages,
            self.failed_pins,
            self.failed_files,
            self.failed_uploads,
            self.failed_threads,
            self.orphaned_replies
        )
    }
}

/// Replays a thread directory into one Discord channel, strictly in order.
pub struct Migrator<'a, D: ?Sized, F: ?Sized> {
    discord: &'a D,
    fetcher: &'a F,
    pins: &'a PinIndex,
    config: &'a MigrationConfig,
    progress: ProgressBar,
}

impl<'a, D, F> Migrator<'a, D, F>
where
    D: DiscordApi + ?Sized,
    F: FileFetcher + ?Sized,
{
    pub fn new(
        discord: &'a D,
        fetcher: &'a F,
        pins: &'a PinIndex,
        config: &'a MigrationConfig,
    ) -> Self {
        Self {
            discord,
            fetcher,
            pins,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Send every root message, then open a Discord thread for its replies.
    /// Individual failures are logged and counted, never returned.
    pub async fn migrate(&self, directory: &ThreadDirectory, channel_id: &str) -> MigrationReport {
        let mut report = MigrationReport::default();
        self.progress.set_length(directory.roots().count() as u64);

        for thread in directory.roots() {
            debug!("moving message at {}", thread.timestamp);
            self.progress.set_message(thread.timestamp.human_readable());

            // with a long message only the last part is pinned and carries the thread
            let anchor = self.deliver(channel_id, thread, &mut report).await;
            if anchor.is_some() {
                report.roots_sent += 1;
            }
            sleep(self.config.throttle).await;
            self.progress.inc(1);

            if thread.reply_times.is_empty() {
                continue;
            }

            let present_replies = thread
                .reply_times
                .iter()
                .filter(|reply| directory.get(reply).is_some())
                .count();

            let Some(anchor) = anchor else {
                warn!(
                    "Message at {} was not sent, skipping its {} replies",
                    thread.timestamp, present_replies
                );
                report.orphaned_replies += present_replies;
                continue;
            };

            let name = thread_name(thread, self.config.thread_name_len);
            let thread_id = match self.discord.create_thread(&anchor, &name).await {
                Ok(thread_id) => thread_id,
                Err(e) => {
                    error!("Creating thread for {} - {e:#}", thread.timestamp);
                    report.failed_threads += 1;
                    report.orphaned_replies += present_replies;
                    continue;
                }
            };

            for reply_time in &thread.reply_times {
                let Some(reply) = directory.get(reply_time) else {
                    continue;
                };
                debug!("\tmoving reply at {reply_time}");

                if self.deliver(&thread_id, reply, &mut report).await.is_some() {
                    report.replies_sent += 1;
                }
                sleep(self.config.throttle).await;
            }
        }

        self.progress.finish_and_clear();
        report
    }

    /// Send all parts of a message, then pin it and attach its files. Returns the
    /// last part sent, if any.
    async fn deliver(
        &self,
        channel_id: &str,
        thread: &Thread,
        report: &mut MigrationReport,
    ) -> Option<MessageHandle> {
        let mut anchor = None;
        for message in &thread.messages {
            match self.discord.send_message(channel_id, &message.to_string()).await {
                Ok(handle) => anchor = Some(handle),
                Err(e) => {
                    error!("Sending message at {} - {e:#}", thread.timestamp);
                    report.failed_messages += 1;
                }
            }
        }
        let anchor = anchor?;

        if self.pins.contains(&thread.timestamp) {
            if let Err(e) = self.discord.pin_message(&anchor).await {
                error!("Pinning message at {} - {e:#}", thread.timestamp);
                report.failed_pins += 1;
            }
        }

        Some(self.attach_files(anchor, &thread.files, report).await)
    }

    async fn attach_files(
        &self,
        mut anchor: MessageHandle,
        files: &[SlackFile],
        report: &mut MigrationReport,
    ) -> MessageHandle {
        let mut attachments = Vec::new();

        for file in files {
            match self.fetcher.fetch(&file.url).await {
                Ok(data) => attachments.push(Attachment {
                    filename: file.title.clone(),
                    data,
                }),
                Err(e) => {
                    warn!("Could not download file {} - {e}", file.title);
                    report.failed_files += 1;
                    anchor = self.annotate(anchor, e.note()).await;
                }
            }
        }

        if attachments.is_empty() {
            return anchor;
        }

        match self.discord.attach_files(&anchor, attachments).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Could not upload files - {e:#}");
                report.failed_uploads += 1;
                self.annotate(anchor, "file upload failed").await
            }
        }
    }

    async fn annotate(&self, anchor: MessageHandle, note: &str) -> MessageHandle {
        match self.discord.append_note(&anchor, note).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Could not add note '{note}' to message {} - {e:#}", anchor.id);
                anchor
            }
        }
    }
}

/// Thread name from the first part of the root message, punctuation removed.
/// Messages without text get a random name.
pub fn thread_name(thread: &Thread, len: usize) -> String {
    if thread.has_text {
        let text = thread
            .messages
            .first()
            .map(|message| message.text.as_str())
            .unwrap_or_default();
        let name: String = text
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .map(|c| if c.is_whitespace() { ' ' } else { c })
            .take(len)
            .collect();

        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, Timestamp};
    use std::path::PathBuf;

    fn thread_with_text(text: &str, has_text: bool) -> Thread {
        Thread {
            timestamp: Timestamp::from_micros(1_000_000),
            messages: vec![Message {
                timestr: "now".to_string(),
                text: text.to_string(),
                username: "alice".to_string(),
            }],
            reply_times: Vec::new(),
            is_reply: false,
            reactions: Vec::new(),
            files: Vec::new(),
            has_text,
            source: PathBuf::new(),
        }
    }

    #[test]
    fn thread_name_strips_punctuation_and_truncates() {
        let thread = thread_with_text("Hey, team! What's up with the deploy?", true);
        assert_eq!(thread_name(&thread, 20), "Hey team Whats up wi");
    }

    #[test]
    fn thread_name_flattens_newlines() {
        let thread = thread_with_text("first\nsecond", true);
        assert_eq!(thread_name(&thread, 20), "first second");
    }

    #[test]
    fn empty_messages_get_random_thread_names() {
        let thread = thread_with_text("<empty>", false);
        let name = thread_name(&thread, 20);
        assert_eq!(name.len(), 20);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));

        let only_punctuation = thread_with_text("?!...", true);
        assert_eq!(thread_name(&only_punctuation, 8).len(), 8);
    }

    #[test]
    fn report_summarises_counts() {
        let report = MigrationReport {
            roots_sent: 3,
            replies_sent: 2,
            failed_files: 1,
            ..MigrationReport::default()
        };
        let summary = report.to_string();
        assert!(summary.starts_with("3 messages and 2 replies migrated"));
        assert!(summary.contains("1 files"));
    }
}
