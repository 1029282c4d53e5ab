//! Archive record types.
//!
//! A [`MessageRecord`] is identified by its [`MessageKey`], the RFC 3339
//! rendering of its timestamp. The key also determines the record's
//! [`DatePath`] (year/month/day) and therefore its permalink.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArchiveError;

/// Identity of an archived message: its timestamp with all non-zero
/// sub-second digits, `Z` for UTC.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey(String);

impl MessageKey {
    pub fn from_timestamp(timestamp: &DateTime<FixedOffset>) -> Self {
        Self(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    /// Parse a key back into the timestamp it was derived from.
    pub fn parse(key: &str) -> Result<(Self, DateTime<FixedOffset>), ArchiveError> {
        let timestamp = DateTime::parse_from_rfc3339(key)
            .map_err(|_| ArchiveError::InvalidKey(key.to_string()))?;
        Ok((Self(key.to_string()), timestamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<MessageKey> for String {
    fn from(key: MessageKey) -> Self {
        key.0
    }
}

/// Zero-padded year/month/day labels locating a day in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePath {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl DatePath {
    /// The calendar date of `timestamp` in the offset it was recorded with.
    pub fn from_timestamp(timestamp: &DateTime<FixedOffset>) -> Self {
        Self {
            year: format!("{:04}", timestamp.year()),
            month: format!("{:02}", timestamp.month()),
            day: format!("{:02}", timestamp.day()),
        }
    }

    /// `/logs/<YYYY>/<MM>/<DD>/#<key>`
    pub fn permalink(&self, key: &MessageKey) -> String {
        format!("{self}#{key}")
    }
}

impl fmt::Display for DatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/logs/{}/{}/{}/", self.year, self.month, self.day)
    }
}

/// One archived channel line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Normalized nick of the sender.
    pub nick: String,
    pub text: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl MessageRecord {
    pub fn key(&self) -> MessageKey {
        MessageKey::from_timestamp(&self.timestamp)
    }

    pub fn date_path(&self) -> DatePath {
        DatePath::from_timestamp(&self.timestamp)
    }

    /// Time of day, `HH:MM:SS`.
    pub fn nice_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }

    pub fn permalink(&self) -> String {
        self.date_path().permalink(&self.key())
    }
}

/// Flat view of a record for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub nick: String,
    pub text: String,
    pub time: String,
    pub key: String,
    pub permalink: String,
}

impl From<&MessageRecord> for MessageView {
    fn from(record: &MessageRecord) -> Self {
        Self {
            nick: record.nick.clone(),
            text: record.text.clone(),
            time: record.nice_time(),
            key: record.key().into(),
            permalink: record.permalink(),
        }
    }
}
