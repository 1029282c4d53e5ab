//! The `.url` directive: links shared in the channel are saved with a pointer
//! back to the conversation and handed to the sharing integrations.

use anyhow::Result;
use chrono::{DateTime, Datelike, FixedOffset};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::archive::MessageKey;
use crate::channel::{ChannelClient, InboundMessage};
use crate::db::{self, SharedDb};
use crate::nick::normalize_nick;
use crate::sharing::Sharing;

pub const USAGE: &str = "syntax: .url http://example.com/ title for link";

/// How many links the recent-links listing returns by default.
pub const RECENT_LINKS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDirective {
    NotADirective,
    /// `.url` with the url or title missing.
    Usage,
    NotAUrl(String),
    Link { url: String, title: String },
}

/// Parse `.url <url> <title...>`.
pub fn parse_directive(text: &str) -> LinkDirective {
    let parts: Vec<&str> = text.split(' ').collect();
    if parts[0] != ".url" {
        return LinkDirective::NotADirective;
    }
    let Some(url) = parts.get(1) else {
        return LinkDirective::Usage;
    };
    if !url.starts_with("http") {
        return LinkDirective::NotAUrl(url.to_string());
    }
    if parts.len() == 2 {
        return LinkDirective::Usage;
    }
    LinkDirective::Link {
        url: url.to_string(),
        title: parts[2..].join(" "),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub nick: String,
    pub url: String,
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub key: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl LinkEntry {
    pub fn new(nick: &str, url: &str, title: &str, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            nick: normalize_nick(nick).to_string(),
            url: url.to_string(),
            title: title.to_string(),
            year: timestamp.year(),
            month: timestamp.month(),
            day: timestamp.day(),
            key: MessageKey::from_timestamp(&timestamp).into(),
            timestamp,
        }
    }

    /// e.g. `Sun Feb 15 12:04:36`
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%a %b %-d %H:%M:%S").to_string()
    }

    /// Permalink of the line that shared the link.
    pub fn discussion_link(&self) -> String {
        format!(
            "/logs/{:04}/{:02}/{:02}/#{}",
            self.year, self.month, self.day, self.key
        )
    }
}

pub fn save_link(conn: &Connection, entry: &LinkEntry) -> Result<()> {
    let data = serde_json::to_string(entry)?;
    conn.execute(
        "INSERT OR REPLACE INTO links (key, unix_secs, unix_nanos, record) VALUES (?1, ?2, ?3, ?4)",
        params![
            entry.key,
            entry.timestamp.timestamp(),
            entry.timestamp.timestamp_subsec_nanos(),
            data,
        ],
    )?;
    Ok(())
}

/// The most recently saved links, newest first.
pub fn recent_links(conn: &Connection, limit: usize) -> Result<Vec<LinkEntry>> {
    let mut stmt = conn.prepare(
        "SELECT key, record FROM links ORDER BY unix_secs DESC, unix_nanos DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .filter_map(|(key, data)| match serde_json::from_str(&data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping undecodable link");
                None
            }
        })
        .collect())
}

/// Handle a possible `.url` directive in a channel line.
pub async fn scan(
    db: &SharedDb,
    client: &dyn ChannelClient,
    sharing: &Sharing,
    message: &InboundMessage,
) -> Result<()> {
    let reply = |text: &str| {
        if let Err(e) = client.send_private_reply(&message.nick, text) {
            tracing::warn!(nick = %message.nick, error = %e, "could not reply to .url");
        }
    };

    let (url, title) = match parse_directive(&message.text) {
        LinkDirective::NotADirective => return Ok(()),
        LinkDirective::Usage => {
            reply(USAGE);
            return Ok(());
        }
        LinkDirective::NotAUrl(url) => {
            reply(&format!("{url} doesn't look like a URL"));
            return Ok(());
        }
        LinkDirective::Link { url, title } => (url, title),
    };

    let entry = LinkEntry::new(&message.nick, &url, &title, message.at);
    let stored = entry.clone();
    db::run_blocking(db, move |conn| save_link(conn, &stored)).await?;
    tracing::info!(nick = %entry.nick, url = %entry.url, "link saved");
    reply("saved your link");

    sharing.share_link(&entry).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn parse_directive_cases() {
        assert_eq!(parse_directive("hello there"), LinkDirective::NotADirective);
        assert_eq!(parse_directive(".urls are neat"), LinkDirective::NotADirective);
        assert_eq!(parse_directive(".url"), LinkDirective::Usage);
        assert_eq!(parse_directive(".url http://foo.com/"), LinkDirective::Usage);
        assert_eq!(
            parse_directive(".url foo.com a title"),
            LinkDirective::NotAUrl("foo.com".into())
        );
        assert_eq!(
            parse_directive(".url http://foo.com/ a nice title"),
            LinkDirective::Link {
                url: "http://foo.com/".into(),
                title: "a nice title".into()
            }
        );
    }

    #[test]
    fn formatted_timestamp() {
        let e = LinkEntry::new("nick", "http://foo.com/", "a title", ts("2015-02-15T12:04:36.439011141-05:00"));
        assert_eq!(e.formatted_timestamp(), "Sun Feb 15 12:04:36");
    }

    #[test]
    fn discussion_link() {
        let e = LinkEntry::new("nick_", "http://foo.com/", "a title", ts("2015-02-15T12:04:36.439011141-05:00"));
        assert_eq!(e.nick, "nick");
        assert_eq!(
            e.discussion_link(),
            "/logs/2015/02/15/#2015-02-15T12:04:36.439011141-05:00"
        );
    }

    #[test]
    fn recent_links_newest_first() {
        let conn = crate::db::open_memory_database().unwrap();
        for (i, at) in ["2015-02-15T12:00:00Z", "2015-02-16T12:00:00Z", "2015-02-17T12:00:00Z"]
            .iter()
            .enumerate()
        {
            let e = LinkEntry::new("nick", &format!("http://foo.com/{i}"), "t", ts(at));
            save_link(&conn, &e).unwrap();
        }

        let links = recent_links(&conn, 2).unwrap();
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["http://foo.com/2", "http://foo.com/1"]);
    }

    #[test]
    fn recent_links_follow_the_clock_not_the_key_text() {
        let conn = crate::db::open_memory_database().unwrap();
        // as text these keys sort 12:00:00.500Z < 12:00:00Z < 11:00:00-05:00
        for (url, at) in [
            ("http://foo.com/first", "2015-02-17T12:00:00Z"),
            ("http://foo.com/second", "2015-02-17T12:00:00.5Z"),
            ("http://foo.com/third", "2015-02-17T11:00:00-05:00"),
        ] {
            save_link(&conn, &LinkEntry::new("nick", url, "t", ts(at))).unwrap();
        }

        let urls: Vec<String> = recent_links(&conn, 10)
            .unwrap()
            .into_iter()
            .map(|l| l.url)
            .collect();
        assert_eq!(
            urls,
            vec!["http://foo.com/third", "http://foo.com/second", "http://foo.com/first"]
        );
    }
}
