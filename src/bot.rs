//! Bot runtime: wires the channel transport, router, presence poller, mention
//! flushes and the optional HTTP API together.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channel::connection::{self, ConnectionSupervisor};
use crate::channel::{irc::IrcClient, ChannelClient, ChannelEvent};
use crate::config::FrontdeskConfig;
use crate::db::{self, SharedDb};
use crate::mentions;
use crate::presence::{self, PollerState, RosterPoller};
use crate::router::Router;
use crate::server;
use crate::sharing::Sharing;

const EVENT_QUEUE: usize = 256;

/// Event handling, independent of where the events come from.
pub struct Bot {
    db: SharedDb,
    client: Arc<dyn ChannelClient>,
    router: Router,
    poller: RosterPoller,
    base_url: String,
}

impl Bot {
    /// Must be called inside a tokio runtime; spawns the idle poller.
    pub fn new(
        db: SharedDb,
        client: Arc<dyn ChannelClient>,
        config: &FrontdeskConfig,
        sharing: Arc<Sharing>,
    ) -> Self {
        let router = Router::new(db.clone(), client.clone(), &config.irc.channel, sharing);
        let poller = RosterPoller::spawn(client.clone(), config.presence.poll_interval());
        Self {
            db,
            client,
            router,
            poller,
            base_url: config.site.base_url.clone(),
        }
    }

    pub fn poller_state(&self) -> PollerState {
        self.poller.state()
    }

    /// Apply one transport event.
    ///
    /// Returns the background tasks the event spawned. An error is a storage
    /// failure and should stop the bot.
    pub async fn handle_event(&self, event: ChannelEvent) -> Result<Vec<JoinHandle<()>>> {
        match event {
            ChannelEvent::Connected => {
                self.poller.start();
                Ok(Vec::new())
            }
            ChannelEvent::Disconnected => {
                self.poller.stop();
                Ok(Vec::new())
            }
            ChannelEvent::Message(message) => {
                let handled = self.router.handle(message).await?;
                Ok(handled.side_effects)
            }
            ChannelEvent::Roster { text, at } => {
                let arrivals = db::run_blocking(&self.db, move |conn| {
                    presence::reconcile(conn, &text, at)
                })
                .await
                .context("failed to reconcile roster")?;

                Ok(arrivals
                    .into_iter()
                    .map(|nick| self.spawn_flush(nick))
                    .collect())
            }
        }
    }

    fn spawn_flush(&self, nick: String) -> JoinHandle<()> {
        let (db, client, base_url) = (self.db.clone(), self.client.clone(), self.base_url.clone());
        tokio::spawn(async move {
            if let Err(e) = mentions::flush(&db, client.as_ref(), &base_url, &nick).await {
                tracing::error!(nick = %nick, error = %e, "mention flush failed");
            }
        })
    }
}

/// Run the bot until ctrl-c or a storage failure.
pub async fn run(config: FrontdeskConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let db = db::shared(db::open_database(&db_path)?);
    tracing::info!(db = %db_path.display(), "database ready");

    let sharing = Arc::new(Sharing::from_config(&config.sharing)?);
    let irc = Arc::new(IrcClient::new(&config.irc.channel));
    let client: Arc<dyn ChannelClient> = irc.clone();
    let bot = Bot::new(db.clone(), client, &config, sharing);

    let (events_tx, mut events) = mpsc::channel(EVENT_QUEUE);
    let supervisor = ConnectionSupervisor::from_config(&config.irc);
    let backoff = supervisor.status();
    let transport = tokio::spawn(connection::run(config.irc.clone(), irc, supervisor, events_tx));

    let http = config.server.http_enabled.then(|| {
        let (db, server_config) = (db.clone(), config.server.clone());
        tokio::spawn(async move {
            if let Err(e) = server::serve(db, backoff, &server_config).await {
                tracing::error!(error = %e, "http api stopped");
            }
        })
    });

    tracing::info!(
        server = %config.irc.server,
        channel = %config.irc.channel,
        nick = %config.irc.nick,
        "frontdesk running"
    );

    let result = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = bot.handle_event(event).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break Ok(());
            }
        }
    };

    transport.abort();
    if let Some(http) = http {
        http.abort();
    }
    result
}
