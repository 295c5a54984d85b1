use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("no video found")]
    NoContent,
    #[error("video not updated: {bvid}({play})")]
    NotUpdated { bvid: String, play: i64 },
    #[error("login challenge failed: {0}")]
    Challenge(String),
    #[error("login qr code expired")]
    LoginExpired,
    #[error("login confirmation timed out")]
    LoginTimeout,
    #[error("qr render failed: {0}")]
    Qr(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
