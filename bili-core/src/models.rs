use serde::{Deserialize, Serialize};

/// The newest upload of the watched account, as reported by the space
/// search endpoint. Fetched fresh on every check, never mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoSnapshot {
    pub bvid: String,
    pub title: String,
    #[serde(default)]
    pub play: i64,
    #[serde(default)]
    pub comment: i64,
    /// Danmaku count; the API calls this field `video_review`.
    #[serde(default, rename = "video_review")]
    pub danmaku: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AccountSummary {
    pub follower: i64,
}

/// A pending QR login attempt: the passport challenge plus the rendered
/// PNG to show the user. Lives only until the confirmation wait resolves.
#[derive(Debug, Clone)]
pub struct LoginChallenge {
    pub qrcode_key: String,
    pub url: String,
    pub png: Vec<u8>,
}

/// The session cookie that authorizes platform calls. An empty cookie
/// means "not authenticated".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub cookie: String,
}

impl SessionCredential {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cookie.is_empty()
    }
}
