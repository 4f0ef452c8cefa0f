use anyhow::Result;
use regex::Regex;

use crate::identity::IdentityTable;

/// Rewrites Slack mrkdwn into Discord markdown.
pub struct TextFormatter<'a> {
    users: &'a IdentityTable,
    channels: &'a IdentityTable,
    labelled_mention: Regex,
    link: Regex,
}

impl<'a> TextFormatter<'a> {
    pub fn new(users: &'a IdentityTable, channels: &'a IdentityTable) -> Result<Self> {
        Ok(Self {
            users,
            channels,
            labelled_mention: Regex::new(r"<([@#])([A-Z0-9]+)\|([^<>]*)>")?,
            link: Regex::new(r"<([^<>|]+)\|([^<>]+)>")?,
        })
    }

    /// Resolve `<@U..>` and `<#C..>` mentions, decode HTML entities and turn
    /// `<url|label>` into `[label](url)`.
    pub fn format(&self, text: &str) -> String {
        // plain substring replacement, a token embedded in a longer one still matches
        let mut text = text.to_string();
        for (user_id, name) in self.users {
            text = text.replace(&format!("<@{user_id}>"), &format!("@{name}"));
        }
        for (channel_id, name) in self.channels {
            text = text.replace(&format!("<#{channel_id}>"), &format!("#{name}"));
        }

        let text = self
            .labelled_mention
            .replace_all(&text, |caps: &regex::Captures| {
                let table = if &caps[1] == "@" {
                    self.users
                } else {
                    self.channels
                };
                let name = table
                    .get(&caps[2])
                    .map(String::as_str)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(&caps[3]);
                format!("{}{}", &caps[1], name)
            });

        let text = html_escape::decode_html_entities(&text);
        self.link.replace_all(&text, "[$2]($1)").into_owned()
    }
}

/// Split `text` into chunks of at most `limit` characters, breaking between
/// whitespace and non-whitespace runs or inside a whitespace run. Whitespace is
/// kept, so the chunks concatenate back to `text`. A single word longer than
/// `limit` gets a chunk of its own.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for token in split_runs(text) {
        let token_len = token.chars().count();

        if token.starts_with(char::is_whitespace) && current_len + token_len > limit {
            for c in token.chars() {
                if current_len >= limit && !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(c);
                current_len += 1;
            }
            continue;
        }

        if current_len + token_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(token);
        current_len += token_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Maximal runs of either whitespace or non-whitespace characters.
fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_whitespace = None;

    for (index, c) in text.char_indices() {
        let is_whitespace = c.is_whitespace();
        match in_whitespace {
            Some(previous) if previous != is_whitespace => {
                runs.push(&text[start..index]);
                start = index;
            }
            _ => {}
        }
        in_whitespace = Some(is_whitespace);
    }

    if start < text.len() {
        runs.push(&text[start..]);
    }

    runs
}
