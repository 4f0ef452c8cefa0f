use serde::{Deserialize, Serialize};

/// A message already delivered to Discord, used to pin, attach to or edit it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageHandle {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreadChannel {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateMessage<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StartThread<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AttachmentSlot {
    pub id: usize,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct EditAttachments {
    pub attachments: Vec<AttachmentSlot>,
}

/// A downloaded file ready to be uploaded.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}
