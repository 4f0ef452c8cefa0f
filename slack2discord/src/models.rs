pub mod discord;
pub mod slack;

use std::{fmt, path::PathBuf, str::FromStr};

use chrono::{Local, TimeZone};
use serde::Deserialize;

use crate::error::RecordDefect;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Slack message timestamp kept as exact microseconds, so it orders and hashes
/// without the pitfalls of a float key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "RawTimestamp")]
pub struct Timestamp(i64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Number(f64),
}

impl TryFrom<RawTimestamp> for Timestamp {
    type Error = RecordDefect;

    fn try_from(raw: RawTimestamp) -> Result<Self, Self::Error> {
        match raw {
            RawTimestamp::Text(text) => text.parse(),
            RawTimestamp::Number(seconds) => Timestamp::from_secs_f64(seconds),
        }
    }
}

impl Timestamp {
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    pub fn from_secs_f64(seconds: f64) -> Result<Self, RecordDefect> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(RecordDefect::InvalidTimestamp(seconds.to_string()));
        }
        Ok(Timestamp((seconds * MICROS_PER_SEC as f64).round() as i64))
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    /// Local time in the form `Apr 10, 2020 at 04:45 AM`.
    pub fn human_readable(&self) -> String {
        let secs = self.0.div_euclid(MICROS_PER_SEC);
        let nanos = (self.0.rem_euclid(MICROS_PER_SEC) * 1_000) as u32;
        match Local.timestamp_opt(secs, nanos).single() {
            Some(datetime) => datetime.format("%b %d, %Y at %I:%M %p").to_string(),
            None => self.to_string(),
        }
    }
}

impl FromStr for Timestamp {
    type Err = RecordDefect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || RecordDefect::InvalidTimestamp(s.to_string());

        let (secs, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if secs.is_empty()
            || !secs.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let secs: i64 = secs.parse().map_err(|_| invalid())?;
        // digits past the sixth are below Slack's resolution
        let mut micros = fraction
            .bytes()
            .take(6)
            .fold(0i64, |acc, b| acc * 10 + i64::from(b - b'0'));
        for _ in fraction.len().min(6)..6 {
            micros *= 10;
        }

        secs.checked_mul(MICROS_PER_SEC)
            .and_then(|v| v.checked_add(micros))
            .map(Timestamp)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0.div_euclid(MICROS_PER_SEC),
            self.0.rem_euclid(MICROS_PER_SEC)
        )
    }
}

/// One post as it will appear in Discord.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub timestr: String,
    pub text: String,
    pub username: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}** *{}*\n{}", self.username, self.timestr, self.text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlackFile {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Author {
    Profile(slack::Profile),
    UserId(String),
    /// File uploads sometimes carry no user at all.
    Unknown,
}

/// A validated export record.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: Timestamp,
    pub text: Option<String>,
    pub author: Author,
    pub reactions: Vec<String>,
    pub files: Vec<SlackFile>,
    pub replies: Vec<Timestamp>,
    pub source: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slack_string_timestamps_exactly() {
        let ts: Timestamp = "1586493900.000200".parse().unwrap();
        assert_eq!(ts.as_micros(), 1_586_493_900_000_200);
        assert_eq!(ts.to_string(), "1586493900.000200");
    }

    #[test]
    fn short_fractions_are_padded() {
        let half: Timestamp = "100.5".parse().unwrap();
        let padded: Timestamp = "100.500000".parse().unwrap();
        let whole: Timestamp = "100".parse().unwrap();

        assert_eq!(half, padded);
        assert_eq!(half.as_micros(), 100_500_000);
        assert!(whole < half);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Timestamp>().is_err());
        assert!("abc".parse::<Timestamp>().is_err());
        assert!("-1.5".parse::<Timestamp>().is_err());
        assert!("1.2.3".parse::<Timestamp>().is_err());
        assert!(Timestamp::from_secs_f64(f64::NAN).is_err());
    }

    #[test]
    fn deserializes_from_string_or_number() {
        let from_text: Timestamp = serde_json::from_str("\"100.5\"").unwrap();
        let from_number: Timestamp = serde_json::from_str("100.5").unwrap();
        assert_eq!(from_text, from_number);
        assert!(serde_json::from_str::<Timestamp>("\"soon\"").is_err());
    }

    #[test]
    fn message_renders_author_header() {
        let message = Message {
            timestr: "Apr 10, 2020 at 04:45 AM".to_string(),
            text: "hello".to_string(),
            username: "alice".to_string(),
        };
        assert_eq!(
            message.to_string(),
            "**alice** *Apr 10, 2020 at 04:45 AM*\nhello"
        );
    }

    #[test]
    fn human_readable_uses_month_day_year() {
        let ts: Timestamp = "1586493900.000200".parse().unwrap();
        let readable = ts.human_readable();
        assert!(readable.contains(", 2020 at "));
        assert!(readable.starts_with("Apr"));
        assert!(readable.ends_with("AM") || readable.ends_with("PM"));
    }
}
