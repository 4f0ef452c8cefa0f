use std::{collections::HashMap, fs, path::Path};

use log::warn;
use serde::de::DeserializeOwned;

use crate::models::slack::{Channel, User};

/// Slack id to human readable name.
pub type IdentityTable = HashMap<String, String>;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("cannot read {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("cannot parse {}: {e}", path.display());
            None
        }
    }
}

/// Map user ids to display names from `users.json`. `None` if the file is
/// missing or malformed. Users without any name are left out.
pub fn load_users(dir: &Path) -> Option<IdentityTable> {
    let users: Vec<User> = read_json(&dir.join("users.json"))?;

    Some(
        users
            .into_iter()
            .filter_map(|user| {
                let name = user.profile.preferred_name()?.to_string();
                Some((user.id, name))
            })
            .collect(),
    )
}

/// Map channel ids to channel names from `channels.json`.
pub fn load_channels(dir: &Path) -> Option<IdentityTable> {
    let channels: Vec<Channel> = read_json(&dir.join("channels.json"))?;

    Some(
        channels
            .into_iter()
            .map(|channel| (channel.id, channel.name))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_prefer_display_name_then_real_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("users.json"),
            r#"[
                {"id": "U1", "profile": {"display_name": "alice", "real_name": "Alice A"}},
                {"id": "U2", "profile": {"display_name": "", "real_name": "Bob B"}},
                {"id": "U3", "profile": {"real_name": "Carol C"}}
            ]"#,
        )
        .unwrap();

        let users = load_users(dir.path()).unwrap();
        assert_eq!(users["U1"], "alice");
        assert_eq!(users["U2"], "Bob B");
        assert_eq!(users["U3"], "Carol C");
    }

    #[test]
    fn nameless_users_are_left_out() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("users.json"),
            r#"[
                {"id": "U1", "profile": {"display_name": "alice"}},
                {"id": "U9", "profile": {"display_name": "", "real_name": ""}},
                {"id": "U8"}
            ]"#,
        )
        .unwrap();

        let users = load_users(dir.path()).unwrap();
        assert_eq!(users.len(), 1);
        assert!(!users.contains_key("U9"));
        assert!(!users.contains_key("U8"));
    }

    #[test]
    fn channels_map_id_to_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("channels.json"),
            r#"[{"id": "C1", "name": "general", "pins": [{"id": "1.0"}]}, {"id": "C2", "name": "random"}]"#,
        )
        .unwrap();

        let channels = load_channels(dir.path()).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels["C2"], "random");
    }

    #[test]
    fn missing_or_malformed_documents_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_users(dir.path()).is_none());

        fs::write(dir.path().join("channels.json"), r#"{"id": "C1"}"#).unwrap();
        assert!(load_channels(dir.path()).is_none());
    }
}
