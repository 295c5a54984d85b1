use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::BiliClient;
use crate::detector::UpdateDetector;
use crate::error::WatchError;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

/// Announcements produced by the background poll loop.
#[derive(Debug, Clone)]
pub enum Event {
    Announcement(String),
}

pub struct PollerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn stop(self) -> Result<(), WatchError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(WatchError::from)
    }
}

/// Spawn the background watch loop.
///
/// Every tick the loop first checks the live credential: once it is found
/// empty the loop exits for good (the activity endpoints are unusable
/// without a session; only a process restart brings the loop back).
/// Otherwise the detector runs and a positive verdict is emitted as an
/// [`Event`] on `update_tx`. "Not updated" and "no video" are the expected
/// steady-state outcomes and only logged; other errors skip the tick.
pub fn spawn_poller(
    client: BiliClient,
    detector: UpdateDetector,
    config: PollConfig,
    update_tx: mpsc::Sender<Event>,
) -> PollerHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // consume the immediate first tick so the loop waits a full
        // interval before its first check
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("poller shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if client.credential().await.is_empty() {
                        info!("no session credential, poller stopping");
                        break;
                    }
                    match detector.evaluate(false).await {
                        Ok(text) => {
                            info!("new video:\n{text}");
                            if update_tx.send(Event::Announcement(text)).await.is_err() {
                                warn!("update receiver dropped");
                            }
                        }
                        Err(err @ (WatchError::NotUpdated { .. } | WatchError::NoContent)) => {
                            debug!(%err, "nothing to announce");
                        }
                        Err(err) => {
                            warn!(%err, "poll cycle failed");
                        }
                    }
                }
            }
        }
    });

    PollerHandle { cancel_tx, join }
}
