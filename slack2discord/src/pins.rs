use std::{collections::HashSet, path::Path};

use log::warn;

use crate::identity::read_json;
use crate::models::{slack::Channel, Timestamp};

/// Timestamps of messages pinned in the source channels.
#[derive(Debug, Default, Clone)]
pub struct PinIndex {
    pinned: HashSet<Timestamp>,
}

impl PinIndex {
    pub fn contains(&self, timestamp: &Timestamp) -> bool {
        self.pinned.contains(timestamp)
    }

    pub fn len(&self) -> usize {
        self.pinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty()
    }
}

impl FromIterator<Timestamp> for PinIndex {
    fn from_iter<I: IntoIterator<Item = Timestamp>>(iter: I) -> Self {
        Self {
            pinned: iter.into_iter().collect(),
        }
    }
}

/// Pins of the named channels from `channels.json`; `None` if the document
/// cannot be read.
pub fn load_pinned(dir: &Path, channel_names: &[String]) -> Option<PinIndex> {
    let channels: Vec<Channel> = read_json(&dir.join("channels.json"))?;

    let pinned = channels
        .into_iter()
        .filter(|channel| channel_names.contains(&channel.name))
        .flat_map(|channel| channel.pins)
        .filter_map(|pin| match pin.id.parse::<Timestamp>() {
            Ok(timestamp) => Some(timestamp),
            Err(e) => {
                warn!("ignoring pin {}: {e}", pin.id);
                None
            }
        })
        .collect();

    Some(pinned)
}
