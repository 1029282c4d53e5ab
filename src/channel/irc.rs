//! IRC line protocol: message parsing, roster assembly, and the
//! [`ChannelClient`] implementation backed by the live connection's outbound
//! queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use super::ChannelClient;
use crate::error::ChannelError;

/// Channel membership prefixes that NAMES replies put in front of nicks.
const MEMBERSHIP_PREFIXES: [char; 5] = ['~', '&', '@', '%', '+'];

/// One parsed IRC protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse `[@tags] [:prefix] COMMAND params... [:trailing]`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        // IRCv3 tags are not used
        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1;
        }
        rest = rest.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, tail) = stripped.split_once(' ')?;
                rest = tail.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, tail)) => (command, tail),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .map(|p| p.split_once('!').map_or(p, |(nick, _)| nick))
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn trailing(&self) -> &str {
        self.params.last().map(String::as_str).unwrap_or("")
    }
}

/// Collects `353` (RPL_NAMREPLY) lines until `366` (RPL_ENDOFNAMES).
#[derive(Debug, Default)]
pub struct RosterBuffer {
    nicks: Vec<String>,
}

impl RosterBuffer {
    pub fn extend(&mut self, names: &str) {
        self.nicks.extend(
            names
                .split(' ')
                .map(|n| n.trim_start_matches(MEMBERSHIP_PREFIXES))
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        );
    }

    /// Take the collected roster as a space-joined list.
    pub fn finish(&mut self) -> String {
        std::mem::take(&mut self.nicks).join(" ")
    }
}

/// `ChannelClient` over the current connection's outbound line queue.
///
/// The connection task attaches a fresh queue on every (re)connect and marks
/// the client registered once the server welcomes it.
pub struct IrcClient {
    channel: String,
    outbound: Mutex<Option<UnboundedSender<String>>>,
    registered: AtomicBool,
}

impl IrcClient {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            outbound: Mutex::new(None),
            registered: AtomicBool::new(false),
        }
    }

    pub(crate) fn attach(&self, outbound: UnboundedSender<String>) {
        if let Ok(mut slot) = self.outbound.lock() {
            *slot = Some(outbound);
        }
    }

    pub(crate) fn mark_registered(&self) {
        self.registered.store(true, Ordering::SeqCst);
    }

    pub(crate) fn detach(&self) {
        self.registered.store(false, Ordering::SeqCst);
        if let Ok(mut slot) = self.outbound.lock() {
            *slot = None;
        }
    }

    fn send_line(&self, line: String) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::NotConnected);
        }
        let slot = self.outbound.lock().map_err(|_| ChannelError::Closed)?;
        let outbound = slot.as_ref().ok_or(ChannelError::NotConnected)?;
        outbound.send(line).map_err(|_| ChannelError::Closed)
    }
}

impl ChannelClient for IrcClient {
    fn send_private_reply(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        self.send_line(format!("PRIVMSG {} :{}", recipient, single_line(text)))
    }

    fn request_roster(&self) -> Result<(), ChannelError> {
        self.send_line(format!("NAMES {}", self.channel))
    }

    fn is_connected(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }
}

/// Outbound text must not smuggle extra protocol lines.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
