//! Periodic roster requests.
//!
//! The poller is idle until the transport reports a connection, then asks for
//! the roster every interval. Replies come back asynchronously as roster
//! events and are reconciled by the bot runtime. `stop()` only clears a flag:
//! a request already issued is not recalled, and reconciliation is idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::channel::ChannelClient;
use crate::error::ChannelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
}

/// Background task issuing roster requests while in [`PollerState::Polling`].
pub struct RosterPoller {
    polling: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RosterPoller {
    /// Spawn the interval task in the idle state.
    pub fn spawn(client: Arc<dyn ChannelClient>, every: Duration) -> Self {
        let polling = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&polling);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if flag.load(Ordering::SeqCst) {
                    poll_once(client.as_ref());
                }
            }
        });

        Self { polling, task }
    }

    pub fn start(&self) {
        if !self.polling.swap(true, Ordering::SeqCst) {
            tracing::info!("roster polling started");
        }
    }

    pub fn stop(&self) {
        if self.polling.swap(false, Ordering::SeqCst) {
            tracing::info!("roster polling stopped");
        }
    }

    pub fn state(&self) -> PollerState {
        if self.polling.load(Ordering::SeqCst) {
            PollerState::Polling
        } else {
            PollerState::Idle
        }
    }
}

impl Drop for RosterPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Issue one roster request. Not being connected yet is not an error.
pub fn poll_once(client: &dyn ChannelClient) {
    match client.request_roster() {
        Ok(()) => tracing::debug!("roster requested"),
        Err(ChannelError::NotConnected) => {
            tracing::debug!("channel client not connected, skipping roster request")
        }
        Err(e) => tracing::warn!(error = %e, "roster request failed"),
    }
}
