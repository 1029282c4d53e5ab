//! Outbound sharing of saved links: Bitly shortening and a webhook cross-post.
//!
//! Everything here is best-effort. A link is already saved by the time it is
//! shared, so failures are logged and never reach the channel.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::SharingConfig;
use crate::links::LinkEntry;
use crate::nick::normalize_nick;

const BITLY_SHORTEN_URL: &str = "https://api-ssl.bitly.com/v4/shorten";
const MAX_POST_CHARS: usize = 140;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Sharing {
    http: reqwest::Client,
    bitly_token: Option<String>,
    webhook_url: Option<String>,
    handle_file: Option<String>,
}

#[derive(Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
}

#[derive(Deserialize)]
struct ShortenResponse {
    link: String,
}

#[derive(Serialize)]
struct WebhookPost<'a> {
    text: &'a str,
    url: &'a str,
    nick: &'a str,
}

impl Sharing {
    pub fn from_config(config: &SharingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            bitly_token: config.bitly_token.clone().filter(|t| !t.is_empty()),
            webhook_url: config.webhook_url.clone().filter(|u| !u.is_empty()),
            handle_file: config.handle_file.clone().filter(|f| !f.is_empty()),
        })
    }

    /// No shortening and no cross-posting.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            bitly_token: None,
            webhook_url: None,
            handle_file: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Shorten `url`, falling back to `url` itself when no token is
    /// configured or the request fails.
    pub async fn shorten(&self, url: &str) -> String {
        let Some(token) = &self.bitly_token else {
            return url.to_string();
        };
        match self.request_short_link(token, url).await {
            Ok(short) => short,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "link shortening failed");
                url.to_string()
            }
        }
    }

    async fn request_short_link(&self, token: &str, url: &str) -> Result<String> {
        let response = self
            .http
            .post(BITLY_SHORTEN_URL)
            .bearer_auth(token)
            .json(&ShortenRequest { long_url: url })
            .send()
            .await
            .context("bitly request failed")?
            .error_for_status()?;
        let body: ShortenResponse = response.json().await.context("bad bitly response")?;
        Ok(body.link)
    }

    /// Cross-post a saved link. Never fails; problems are logged.
    pub async fn share_link(&self, entry: &LinkEntry) {
        let Some(webhook) = &self.webhook_url else {
            return;
        };

        let short = self.shorten(&entry.url).await;
        let handle = self.handle_for(&entry.nick).await;
        let text = compose_post(&short, &entry.title, handle.as_deref());

        let post = WebhookPost {
            text: &text,
            url: &entry.url,
            nick: &entry.nick,
        };
        let result = self
            .http
            .post(webhook)
            .json(&post)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => tracing::info!(url = %entry.url, "link cross-posted"),
            Err(e) => tracing::warn!(url = %entry.url, error = %e, "cross-post failed"),
        }
    }

    async fn handle_for(&self, nick: &str) -> Option<String> {
        let path = self.handle_file.as_ref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => handle_for_nick(&contents, nick),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "could not read handle file");
                None
            }
        }
    }
}

/// Look up a nick's handle in `nick,handle` CSV lines.
pub fn handle_for_nick(contents: &str, nick: &str) -> Option<String> {
    let nick = normalize_nick(nick);
    contents.lines().find_map(|line| {
        let (who, handle) = line.split_once(',')?;
        let handle = handle.trim().trim_start_matches('@');
        (normalize_nick(who.trim()) == nick && !handle.is_empty()).then(|| handle.to_string())
    })
}

/// `<url>: <title>[ via @handle]`, shortening the title with `...` so the
/// whole post fits in 140 characters.
pub fn compose_post(url: &str, title: &str, handle: Option<&str>) -> String {
    let prefix = format!("{url}: ");
    let suffix = handle.map(|h| format!(" via @{h}")).unwrap_or_default();

    let room = MAX_POST_CHARS.saturating_sub(prefix.chars().count() + suffix.chars().count());
    let title = if title.chars().count() <= room {
        title.to_string()
    } else {
        let keep = room.saturating_sub(3);
        let mut short: String = title.chars().take(keep).collect();
        short.push_str("...");
        short
    };

    format!("{prefix}{title}{suffix}")
}
