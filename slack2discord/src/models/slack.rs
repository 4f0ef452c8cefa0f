use std::path::Path;

use log::warn;
use serde::Deserialize;

use super::{Author, Record, SlackFile, Timestamp};
use crate::error::RecordDefect;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Profile {
    pub display_name: Option<String>,
    pub real_name: Option<String>,
}

impl Profile {
    /// Display name, or the real name when the display name is blank.
    pub fn preferred_name(&self) -> Option<&str> {
        [&self.display_name, &self.real_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|name| !name.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub profile: Profile,
}

#[derive(Debug, Deserialize)]
pub struct Pin {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub pins: Vec<Pin>,
}

#[derive(Debug, Deserialize)]
pub struct Reaction {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct File {
    pub title: Option<String>,
    pub name: Option<String>,
    pub url_private_download: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRef {
    pub ts: Timestamp,
}

/// A message exactly as it appears in `<channel>/<date>.json`.
#[derive(Debug, Deserialize)]
pub struct ExportedMessage {
    pub ts: Option<Timestamp>,
    pub text: Option<String>,
    pub user: Option<String>,
    pub user_profile: Option<Profile>,
    pub reactions: Option<Vec<Reaction>>,
    pub files: Option<Vec<File>>,
    pub replies: Option<Vec<ReplyRef>>,
}

impl ExportedMessage {
    pub fn into_record(self, source: &Path) -> Result<Record, RecordDefect> {
        let timestamp = self.ts.ok_or(RecordDefect::MissingTimestamp)?;

        let author = match (self.user_profile, self.user) {
            (Some(profile), _) => Author::Profile(profile),
            (None, Some(user_id)) => Author::UserId(user_id),
            (None, None) if self.files.is_some() => Author::Unknown,
            (None, None) => return Err(RecordDefect::MissingAuthor),
        };

        let files = self
            .files
            .unwrap_or_default()
            .into_iter()
            .filter_map(|file| {
                let title = file
                    .title
                    .or(file.name)
                    .unwrap_or_else(|| "file".to_string());
                match file.url_private_download {
                    Some(url) => Some(SlackFile { title, url }),
                    None => {
                        warn!("file {title} at {timestamp} has no download url, skipping");
                        None
                    }
                }
            })
            .collect();

        let mut replies: Vec<Timestamp> = self
            .replies
            .unwrap_or_default()
            .into_iter()
            .map(|reply| reply.ts)
            .collect();
        replies.sort();

        Ok(Record {
            timestamp,
            text: self.text,
            author,
            reactions: self
                .reactions
                .unwrap_or_default()
                .into_iter()
                .map(|reaction| reaction.name)
                .collect(),
            files,
            replies,
            source: source.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Record, RecordDefect> {
        serde_json::from_str::<ExportedMessage>(json)
            .unwrap()
            .into_record(Path::new("general/2020-04-10.json"))
    }

    #[test]
    fn reads_full_message() {
        let record = parse(
            r#"{
                "ts": "100.0",
                "text": "hello",
                "user_profile": {"display_name": "", "real_name": "Alice Doe"},
                "reactions": [{"name": "tada", "count": 2}],
                "files": [{"title": "plan.pdf", "url_private_download": "https://files/plan"}],
                "replies": [{"ts": "100.9"}, {"ts": "100.5"}]
            }"#,
        )
        .unwrap();

        assert_eq!(record.timestamp, "100.0".parse::<Timestamp>().unwrap());
        assert_eq!(record.text.as_deref(), Some("hello"));
        assert_eq!(record.reactions, vec!["tada"]);
        assert_eq!(record.files[0].title, "plan.pdf");
        assert_eq!(
            record.replies,
            vec![
                "100.5".parse::<Timestamp>().unwrap(),
                "100.9".parse::<Timestamp>().unwrap()
            ]
        );
    }

    #[test]
    fn file_title_falls_back_to_name() {
        let record = parse(
            r#"{"ts": "1.0", "files": [
                {"name": "img.png", "url_private_download": "https://files/img"},
                {"title": "gone"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(record.author, Author::Unknown);
        assert_eq!(
            record.files,
            vec![SlackFile {
                title: "img.png".to_string(),
                url: "https://files/img".to_string()
            }]
        );
    }

    #[test]
    fn rejects_missing_fields() {
        assert_eq!(
            parse(r#"{"text": "hi", "user": "U1"}"#).unwrap_err(),
            RecordDefect::MissingTimestamp
        );
        assert_eq!(
            parse(r#"{"ts": "1.0", "text": "hi"}"#).unwrap_err(),
            RecordDefect::MissingAuthor
        );
    }

    #[test]
    fn preferred_name_skips_blank_display_name() {
        let profile = Profile {
            display_name: Some(String::new()),
            real_name: Some("Alice".to_string()),
        };
        assert_eq!(profile.preferred_name(), Some("Alice"));
        assert_eq!(Profile::default().preferred_name(), None);
    }
}
