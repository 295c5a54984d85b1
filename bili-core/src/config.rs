use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::WatchError;

/// Runtime configuration, loadable from a local file or a remote URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Telegram bot token.
    pub token: String,
    /// Where the session credential is persisted.
    pub cache_store: PathBuf,
    /// The watched account id.
    pub mid: u64,
    /// Chat ids that receive announcements.
    #[serde(default)]
    pub admins: Vec<i64>,
    /// Seconds between poll cycles; one minute when unset.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl Config {
    pub async fn load(source: &str) -> Result<Self, WatchError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            let config = client
                .get(source)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(config)
        } else {
            let bytes = tokio::fs::read(source).await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(60))
    }
}
