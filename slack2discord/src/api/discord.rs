use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, multipart, Client, Response};
use std::time::Duration;

use crate::models::discord::{
    Attachment, AttachmentSlot, CreateMessage, EditAttachments, MessageHandle, StartThread,
    ThreadChannel,
};

const DISCORD_API_URL: &str = "https://discord.com/api/v10";
const NOTE_PREFIX: &str = "[slack2discord]";

#[async_trait]
pub trait DiscordApi {
    /// Post a message to a channel or thread.
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<MessageHandle>;
    /// Open a thread under `anchor`, returning the thread's channel id.
    async fn create_thread(&self, anchor: &MessageHandle, name: &str) -> Result<String>;
    async fn pin_message(&self, message: &MessageHandle) -> Result<()>;
    async fn attach_files(
        &self,
        message: &MessageHandle,
        files: Vec<Attachment>,
    ) -> Result<MessageHandle>;
    /// Append a `[slack2discord] <note>` line to an existing message.
    async fn append_note(&self, message: &MessageHandle, note: &str) -> Result<MessageHandle>;
}

pub fn content_with_note(content: &str, note: &str) -> String {
    format!("{content}\n{NOTE_PREFIX} {note}")
}

pub struct DiscordClient {
    client: Client,
    base_url: String,
}

impl DiscordClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(DISCORD_API_URL.to_string(), token)
    }

    pub fn with_base_url(base_url: String, token: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bot {}", token))
                .context("Discord token contains invalid characters")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn message_url(&self, message: &MessageHandle) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.base_url, message.channel_id, message.id
        )
    }
}

async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(anyhow::anyhow!(
            "cannot {} with status {}: {}",
            action,
            status,
            error_text
        ));
    }

    Ok(response)
}

#[async_trait]
impl DiscordApi for DiscordClient {
    async fn send_message(&self, channel_id: &str, content: &str) -> Result<MessageHandle> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);

        let response = self
            .client
            .post(&url)
            .json(&CreateMessage { content })
            .send()
            .await?;

        let message = ensure_success(response, "send message").await?.json().await?;

        Ok(message)
    }

    async fn create_thread(&self, anchor: &MessageHandle, name: &str) -> Result<String> {
        let url = format!("{}/threads", self.message_url(anchor));

        let response = self
            .client
            .post(&url)
            .json(&StartThread { name })
            .send()
            .await?;

        let thread: ThreadChannel = ensure_success(response, "create thread")
            .await?
            .json()
            .await?;

        Ok(thread.id)
    }

    async fn pin_message(&self, message: &MessageHandle) -> Result<()> {
        let url = format!(
            "{}/channels/{}/pins/{}",
            self.base_url, message.channel_id, message.id
        );

        let response = self.client.put(&url).send().await?;
        ensure_success(response, "pin message").await?;

        Ok(())
    }

    async fn attach_files(
        &self,
        message: &MessageHandle,
        files: Vec<Attachment>,
    ) -> Result<MessageHandle> {
        let payload = EditAttachments {
            attachments: files
                .iter()
                .enumerate()
                .map(|(id, file)| AttachmentSlot {
                    id,
                    filename: file.filename.clone(),
                })
                .collect(),
        };

        let mut form = multipart::Form::new().text("payload_json", serde_json::to_string(&payload)?);
        for (index, file) in files.into_iter().enumerate() {
            let part = multipart::Part::bytes(file.data).file_name(file.filename);
            form = form.part(format!("files[{index}]"), part);
        }

        let response = self
            .client
            .patch(self.message_url(message))
            .multipart(form)
            .send()
            .await?;

        let message = ensure_success(response, "upload files").await?.json().await?;

        Ok(message)
    }

    async fn append_note(&self, message: &MessageHandle, note: &str) -> Result<MessageHandle> {
        let content = content_with_note(&message.content, note);

        let response = self
            .client
            .patch(self.message_url(message))
            .json(&CreateMessage { content: &content })
            .send()
            .await?;

        let message = ensure_success(response, "edit message").await?.json().await?;

        Ok(message)
    }
}
