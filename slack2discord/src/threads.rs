//! Rebuilds Slack conversations from the flat list of exported messages.
//!
//! Slack only records threads from the parent side: a root message lists the
//! timestamps of its replies. The directory is an ordered map keyed by
//! timestamp, and every link between threads is a key lookup.

use std::collections::{btree_map::Entry, BTreeMap};
use std::path::PathBuf;

use crate::error::MigrateError;
use crate::format::{chunk_text, TextFormatter};
use crate::identity::IdentityTable;
use crate::models::{Author, Message, Record, SlackFile, Timestamp};

/// Body used for messages without text, so files and replies have something to hang on.
pub const EMPTY_PLACEHOLDER: &str = "<empty>";
/// Author used for file uploads without a user.
pub const UNKNOWN_USER: &str = "user_not_found";

#[derive(Debug, Clone)]
pub struct Thread {
    pub timestamp: Timestamp,
    /// A long body is split into several consecutive messages.
    pub messages: Vec<Message>,
    /// Ascending.
    pub reply_times: Vec<Timestamp>,
    pub is_reply: bool,
    // TODO: replay reactions once emoji names can be mapped to Discord emoji
    pub reactions: Vec<String>,
    pub files: Vec<SlackFile>,
    pub has_text: bool,
    pub source: PathBuf,
}

impl Thread {
    fn from_record(
        record: Record,
        users: &IdentityTable,
        formatter: &TextFormatter,
        text_limit: usize,
    ) -> Self {
        let timestr = record.timestamp.human_readable();
        let username = author_name(&record.author, users);

        let texts = match record.text.as_deref() {
            Some(text) if !text.is_empty() => chunk_text(&formatter.format(text), text_limit),
            _ => Vec::new(),
        };
        let has_text = !texts.is_empty();
        let texts = if has_text {
            texts
        } else {
            vec![EMPTY_PLACEHOLDER.to_string()]
        };

        Thread {
            timestamp: record.timestamp,
            messages: texts
                .into_iter()
                .map(|text| Message {
                    timestr: timestr.clone(),
                    text,
                    username: username.clone(),
                })
                .collect(),
            reply_times: record.replies,
            is_reply: false,
            reactions: record.reactions,
            files: record.files,
            has_text,
            source: record.source,
        }
    }

    /// Marks the thread as living inside another thread. There is no way back.
    pub fn mark_as_reply(&mut self) {
        self.is_reply = true;
    }
}

fn author_name(author: &Author, users: &IdentityTable) -> String {
    let name = match author {
        Author::Profile(profile) => profile.preferred_name().map(str::to_string),
        Author::UserId(user_id) => users.get(user_id).cloned(),
        Author::Unknown => None,
    };

    name.unwrap_or_else(|| UNKNOWN_USER.to_string())
}

/// Every exported message by timestamp, in chronological order.
#[derive(Debug, Default)]
pub struct ThreadDirectory {
    threads: BTreeMap<Timestamp, Thread>,
}

impl ThreadDirectory {
    /// Build the directory and flag every thread some other thread lists as a reply.
    ///
    /// Two records with the same timestamp are rejected: the directory would
    /// otherwise silently keep only one of them.
    pub fn build(
        records: impl IntoIterator<Item = Record>,
        users: &IdentityTable,
        formatter: &TextFormatter,
        text_limit: usize,
    ) -> Result<Self, MigrateError> {
        let mut threads: BTreeMap<Timestamp, Thread> = BTreeMap::new();

        for record in records {
            let thread = Thread::from_record(record, users, formatter, text_limit);
            match threads.entry(thread.timestamp) {
                Entry::Vacant(slot) => {
                    slot.insert(thread);
                }
                Entry::Occupied(existing) => {
                    return Err(MigrateError::DuplicateTimestamp {
                        timestamp: thread.timestamp,
                        first: existing.get().source.clone(),
                        second: thread.source,
                    });
                }
            }
        }

        let replies: Vec<Timestamp> = threads
            .values()
            .flat_map(|thread| {
                let own = thread.timestamp;
                thread.reply_times.iter().copied().filter(move |reply| *reply != own)
            })
            .collect();

        for reply in replies {
            // replies exported outside the selected channels are simply absent
            if let Some(thread) = threads.get_mut(&reply) {
                thread.mark_as_reply();
            }
        }

        Ok(Self { threads })
    }

    pub fn get(&self, timestamp: &Timestamp) -> Option<&Thread> {
        self.threads.get(timestamp)
    }

    /// All threads, replies included, by ascending timestamp.
    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// Threads delivered at the top level.
    pub fn roots(&self) -> impl Iterator<Item = &Thread> {
        self.iter().filter(|thread| !thread.is_reply)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::slack::Profile;
    use std::path::Path;

    fn record(ts: &str, text: &str, replies: &[&str]) -> Record {
        Record {
            timestamp: ts.parse().unwrap(),
            text: Some(text.to_string()),
            author: Author::UserId("U1".to_string()),
            reactions: Vec::new(),
            files: Vec::new(),
            replies: replies.iter().map(|r| r.parse().unwrap()).collect(),
            source: Path::new("general/day.json").to_path_buf(),
        }
    }

    fn build(records: Vec<Record>) -> Result<ThreadDirectory, MigrateError> {
        let users: IdentityTable = [("U1".to_string(), "alice".to_string())].into();
        let channels = IdentityTable::new();
        let formatter = TextFormatter::new(&users, &channels).unwrap();
        ThreadDirectory::build(records, &users, &formatter, 1800)
    }

    fn ts(value: &str) -> Timestamp {
        value.parse().unwrap()
    }

    #[test]
    fn replies_are_flagged_and_hidden_from_roots() {
        let directory = build(vec![
            record("100.5", "hi back", &[]),
            record("100.0", "hello", &["100.5"]),
        ])
        .unwrap();

        assert_eq!(directory.len(), 2);
        assert!(directory.get(&ts("100.5")).unwrap().is_reply);
        assert!(!directory.get(&ts("100.0")).unwrap().is_reply);

        let roots: Vec<Timestamp> = directory.roots().map(|t| t.timestamp).collect();
        assert_eq!(roots, vec![ts("100.0")]);
    }

    #[test]
    fn iteration_is_strictly_ascending() {
        let directory = build(vec![
            record("300.0", "c", &[]),
            record("100.000001", "b", &[]),
            record("100.0", "a", &[]),
        ])
        .unwrap();

        let order: Vec<Timestamp> = directory.iter().map(|t| t.timestamp).collect();
        assert!(order.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn self_reference_does_not_make_a_reply() {
        let directory = build(vec![record("1.0", "me", &["1.0", "2.0"])]).unwrap();
        assert!(!directory.get(&ts("1.0")).unwrap().is_reply);
    }

    #[test]
    fn missing_replies_are_ignored() {
        let directory = build(vec![record("1.0", "root", &["9.0"])]).unwrap();
        let root = directory.get(&ts("1.0")).unwrap();
        assert_eq!(root.reply_times, vec![ts("9.0")]);
        assert!(directory.get(&ts("9.0")).is_none());
    }

    #[test]
    fn empty_message_gets_placeholder() {
        let mut empty = record("1.0", "", &[]);
        empty.text = None;
        empty.author = Author::Unknown;

        let directory = build(vec![empty]).unwrap();
        let thread = directory.get(&ts("1.0")).unwrap();

        assert_eq!(thread.messages.len(), 1);
        assert_eq!(thread.messages[0].text, EMPTY_PLACEHOLDER);
        assert_eq!(thread.messages[0].username, UNKNOWN_USER);
        assert!(!thread.has_text);
    }

    #[test]
    fn long_text_becomes_several_messages() {
        let users = IdentityTable::new();
        let channels = IdentityTable::new();
        let formatter = TextFormatter::new(&users, &channels).unwrap();
        let text = "word ".repeat(10);

        let directory =
            ThreadDirectory::build(vec![record("1.0", &text, &[])], &users, &formatter, 12).unwrap();
        let thread = directory.get(&ts("1.0")).unwrap();

        assert!(thread.messages.len() > 1);
        let rebuilt: String = thread.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(thread.messages.iter().all(|m| m.username == UNKNOWN_USER));
    }

    #[test]
    fn duplicate_timestamps_are_a_conflict() {
        let result = build(vec![record("1.0", "first", &[]), record("1.0", "second", &[])]);
        assert!(matches!(
            result,
            Err(MigrateError::DuplicateTimestamp { .. })
        ));
    }

    #[test]
    fn author_prefers_profile_then_user_table() {
        let users: IdentityTable = [("U1".to_string(), "alice".to_string())].into();
        let profile = Author::Profile(Profile {
            display_name: Some(String::new()),
            real_name: Some("Alice Doe".to_string()),
        });

        assert_eq!(author_name(&profile, &users), "Alice Doe");
        assert_eq!(author_name(&Author::UserId("U1".to_string()), &users), "alice");
        assert_eq!(author_name(&Author::UserId("U2".to_string()), &users), UNKNOWN_USER);
    }
}
