//! Connection lifecycle for the IRC transport.
//!
//! [`run`] keeps one session alive at a time: connect, register, translate
//! protocol lines into [`ChannelEvent`]s, and on loss reconnect after the
//! delay chosen by the [`ConnectionSupervisor`].

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::irc::{IrcClient, IrcMessage, RosterBuffer};
use super::{ChannelEvent, InboundMessage};
use crate::config::IrcConfig;

/// Read side of the supervisor's backoff counter, shared with the HTTP API.
#[derive(Debug, Clone, Default)]
pub struct BackoffStatus(Arc<AtomicU32>);

impl BackoffStatus {
    /// Failed sessions since the last successful registration.
    pub fn attempts(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn is_backing_off(&self) -> bool {
        self.attempts() > 0
    }
}

/// Reconnect state: exponential backoff between failed sessions.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    attempts: BackoffStatus,
    base: Duration,
    max: Duration,
}

impl ConnectionSupervisor {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            attempts: BackoffStatus::default(),
            base,
            max,
        }
    }

    pub fn from_config(config: &IrcConfig) -> Self {
        Self::new(
            Duration::from_secs(config.reconnect_base_secs),
            Duration::from_secs(config.reconnect_max_secs),
        )
    }

    /// Delay before the next attempt: `base * 2^attempts`, capped at `max`.
    pub fn next_delay(&mut self) -> Duration {
        let attempts = self.attempts.attempts();
        let factor = 1u32.checked_shl(attempts.min(16)).unwrap_or(u32::MAX);
        self.attempts
            .0
            .store(attempts.saturating_add(1), Ordering::Relaxed);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// A session registered successfully.
    pub fn reset(&mut self) {
        self.attempts.0.store(0, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.attempts()
    }

    /// A handle that observes this supervisor's backoff counter.
    pub fn status(&self) -> BackoffStatus {
        self.attempts.clone()
    }
}

/// Run the IRC transport until the event consumer goes away.
pub async fn run(
    config: IrcConfig,
    client: Arc<IrcClient>,
    mut supervisor: ConnectionSupervisor,
    events: mpsc::Sender<ChannelEvent>,
) -> Result<()> {
    loop {
        match session(&config, &client, &events, &mut supervisor).await {
            Ok(()) => tracing::info!(server = %config.server, "irc connection closed"),
            Err(e) => tracing::warn!(server = %config.server, error = %e, "irc connection failed"),
        }
        client.detach();

        if events.send(ChannelEvent::Disconnected).await.is_err() {
            tracing::debug!("event consumer gone, stopping irc transport");
            return Ok(());
        }

        let delay = supervisor.next_delay();
        tracing::info!(
            attempt = supervisor.attempts(),
            delay_secs = delay.as_secs(),
            "reconnecting to irc"
        );
        tokio::time::sleep(delay).await;
    }
}

/// One connection from TCP connect to EOF.
async fn session(
    config: &IrcConfig,
    client: &IrcClient,
    events: &mpsc::Sender<ChannelEvent>,
    supervisor: &mut ConnectionSupervisor,
) -> Result<()> {
    let addr = format!("{}:{}", config.server, config.port);
    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    tracing::info!(addr = %addr, "connected to irc server");

    let (reader, mut writer) = stream.into_split();
    let (outbound, mut queue) = mpsc::unbounded_channel::<String>();
    client.attach(outbound.clone());

    let write_task = tokio::spawn(async move {
        while let Some(line) = queue.recv().await {
            tracing::trace!(line = %line, "irc >>");
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\r\n").await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut nick = config.nick.clone();
    let _ = outbound.send(format!("NICK {nick}"));
    let _ = outbound.send(format!("USER {nick} 0 * :{}", config.realname));

    let result = read_loop(
        config,
        client,
        events,
        supervisor,
        BufReader::new(reader),
        &outbound,
        &mut nick,
    )
    .await;

    write_task.abort();
    result
}

async fn read_loop<R>(
    config: &IrcConfig,
    client: &IrcClient,
    events: &mpsc::Sender<ChannelEvent>,
    supervisor: &mut ConnectionSupervisor,
    mut reader: R,
    outbound: &mpsc::UnboundedSender<String>,
    nick: &mut String,
) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut roster = RosterBuffer::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader
            .read_until(b'\n', &mut buf)
            .await
            .context("failed to read from irc")?
            == 0
        {
            break;
        }
        // IRC lines are bytes; non-UTF-8 text is kept with replacement characters
        let line = String::from_utf8_lossy(&buf);
        let Some(msg) = IrcMessage::parse(&line) else {
            continue;
        };

        let event = match msg.command.as_str() {
            "PING" => {
                let _ = outbound.send(format!("PONG :{}", msg.trailing()));
                None
            }
            // RPL_WELCOME: registration complete
            "001" => {
                client.mark_registered();
                supervisor.reset();
                let _ = outbound.send(format!("JOIN {}", config.channel));
                let _ = outbound.send(format!("NAMES {}", config.channel));
                tracing::info!(nick = %nick, channel = %config.channel, "registered with irc server");
                Some(ChannelEvent::Connected)
            }
            // ERR_NICKNAMEINUSE
            "433" => {
                nick.push('_');
                tracing::warn!(nick = %nick, "nick in use, retrying");
                let _ = outbound.send(format!("NICK {nick}"));
                None
            }
            "353" if is_channel(msg.param(2), &config.channel) => {
                roster.extend(msg.trailing());
                None
            }
            "366" if is_channel(msg.param(1), &config.channel) => Some(ChannelEvent::Roster {
                text: roster.finish(),
                at: Local::now().fixed_offset(),
            }),
            "PRIVMSG" => match (msg.nick(), msg.param(0)) {
                (Some(sender), Some(target)) => Some(ChannelEvent::Message(InboundMessage {
                    nick: sender.to_string(),
                    target: target.to_string(),
                    text: msg.trailing().to_string(),
                    at: Local::now().fixed_offset(),
                })),
                _ => None,
            },
            "ERROR" => {
                tracing::warn!(reason = %msg.trailing(), "irc server error");
                None
            }
            other => {
                tracing::debug!(command = %other, nick = ?msg.nick(), text = %msg.trailing(), "irc");
                None
            }
        };

        if let Some(event) = event {
            events
                .send(event)
                .await
                .context("channel event queue closed")?;
        }
    }

    Ok(())
}

fn is_channel(param: Option<&str>, channel: &str) -> bool {
    param.is_some_and(|p| p.eq_ignore_ascii_case(channel))
}
