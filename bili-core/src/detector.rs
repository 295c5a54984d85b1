use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::client::BiliClient;
use crate::error::WatchError;
use crate::models::{AccountSummary, VideoSnapshot};

/// Remembers the play count last announced per video and decides whether
/// the newest upload warrants another announcement.
#[derive(Debug, Clone)]
pub struct UpdateDetector {
    client: BiliClient,
    mid: u64,
    state: Arc<Mutex<HashMap<String, i64>>>,
}

impl UpdateDetector {
    pub fn new(client: BiliClient, mid: u64) -> Self {
        Self {
            client,
            mid,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch the newest video and render an announcement for it.
    ///
    /// A video seen for the first time is always announced. Afterwards,
    /// unless `force` is set, a play count still in the same decimal
    /// magnitude as the recorded one (equal digit count, equal leading
    /// digit) is reported as `NotUpdated`. The recorded count is only
    /// overwritten once the follower lookup succeeds, so a failed lookup
    /// leaves the video eligible for the next cycle.
    ///
    /// The state lock is held for the whole call; the background poll and
    /// an on-demand check serialize here, last completed write wins.
    pub async fn evaluate(&self, force: bool) -> Result<String, WatchError> {
        let mut state = self.state.lock().await;

        let video = self.client.latest_video(self.mid).await?;
        if let Some(&previous) = state.get(&video.bvid) {
            if !force && same_magnitude(previous, video.play) {
                return Err(WatchError::NotUpdated {
                    bvid: video.bvid,
                    play: video.play,
                });
            }
        }

        let card = self.client.account_summary(self.mid).await?;
        state.insert(video.bvid.clone(), video.play);
        Ok(render_announcement(&video, card))
    }
}

/// Coarse change check: two counts are treated as unchanged when their
/// base-10 representations have the same length and the same first digit.
pub fn same_magnitude(previous: i64, current: i64) -> bool {
    let previous = previous.to_string();
    let current = current.to_string();
    previous.len() == current.len() && previous.as_bytes()[0] == current.as_bytes()[0]
}

fn render_announcement(video: &VideoSnapshot, card: AccountSummary) -> String {
    format!(
        "Plays: {}\n\"{}\"\nDanmaku: {}\nComments: {}\nLink: https://www.bilibili.com/video/{}\n\n----\n\nAs of {}\nFollowers: {}",
        video.play,
        video.title,
        video.danmaku,
        video.comment,
        video.bvid,
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        card.follower,
    )
}
