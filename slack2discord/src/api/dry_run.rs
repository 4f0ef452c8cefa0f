use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::atomic::{AtomicU64, Ordering};

use super::discord::{content_with_note, DiscordApi};
use crate::models::discord::{Attachment, MessageHandle};

/// Stands in for Discord: logs every call and hands out sequential ids.
#[derive(Default)]
pub struct DryRunClient {
    next_id: AtomicU64,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}

#[async_trait]
impl DiscordApi for DryRunClient {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<MessageHandle> {
        let id = self.next_id();
        info!("[dry-run] #{channel_id} <- message {id}:\n{content}");
        Ok(MessageHandle {
            id,
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        })
    }

    async fn create_thread(&self, anchor: &MessageHandle, name: &str) -> Result<String> {
        let id = self.next_id();
        info!("[dry-run] thread {id} '{name}' under message {}", anchor.id);
        Ok(id)
    }

    async fn pin_message(&self, message: &MessageHandle) -> Result<()> {
        info!("[dry-run] pin message {}", message.id);
        Ok(())
    }

    async fn attach_files(
        &self,
        message: &MessageHandle,
        files: Vec<Attachment>,
    ) -> Result<MessageHandle> {
        for file in &files {
            info!(
                "[dry-run] attach {} ({} bytes) to message {}",
                file.filename,
                file.data.len(),
                message.id
            );
        }
        Ok(message.clone())
    }

    async fn append_note(&self, message: &MessageHandle, note: &str) -> Result<MessageHandle> {
        info!("[dry-run] note '{note}' on message {}", message.id);
        Ok(MessageHandle {
            content: content_with_note(&message.content, note),
            ..message.clone()
        })
    }
}
