use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, SET_COOKIE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::WatchError;
use crate::models::{AccountSummary, SessionCredential, VideoSnapshot};

const API_BASE: &str = "https://api.bilibili.com";
const PASSPORT_BASE: &str = "https://passport.bilibili.com";

// The API rejects requests without a browser-looking UA and referer.
const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// QR confirmation poll states reported in `data.code`.
pub const QR_CONFIRMED: i64 = 0;
pub const QR_NOT_SCANNED: i64 = 86101;
pub const QR_SCANNED: i64 = 86090;
pub const QR_EXPIRED: i64 = 86038;

#[derive(Deserialize)]
struct ApiResponse<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct VideoList {
    list: VideoListInner,
}

#[derive(Deserialize)]
struct VideoListInner {
    #[serde(default)]
    vlist: Vec<VideoSnapshot>,
}

#[derive(Deserialize)]
struct QrGenerate {
    url: String,
    qrcode_key: String,
}

/// One confirmation poll result.
#[derive(Debug, Clone, Deserialize)]
pub struct QrPoll {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// HTTP client for the platform API. Holds the live session credential,
/// which every request path shares; the cookie is attached to outgoing
/// requests whenever it is non-empty.
#[derive(Debug, Clone)]
pub struct BiliClient {
    http: reqwest::Client,
    api_base: String,
    passport_base: String,
    credential: Arc<RwLock<String>>,
}

impl BiliClient {
    pub fn new() -> Result<Self, WatchError> {
        Self::with_base_urls(API_BASE, PASSPORT_BASE)
    }

    /// Build a client against alternative endpoints (used by tests).
    pub fn with_base_urls(
        api_base: impl Into<String>,
        passport_base: impl Into<String>,
    ) -> Result<Self, WatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(REFERER, HeaderValue::from_static("https://www.bilibili.com"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            passport_base: passport_base.into(),
            credential: Arc::new(RwLock::new(String::new())),
        })
    }

    pub async fn credential(&self) -> SessionCredential {
        SessionCredential::new(self.credential.read().await.clone())
    }

    pub async fn set_credential(&self, credential: SessionCredential) {
        *self.credential.write().await = credential.cookie;
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, WatchError> {
        let mut request = self.http.get(&url);
        let cookie = self.credential.read().await.clone();
        if !cookie.is_empty() {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?.error_for_status()?;
        let envelope: ApiResponse<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(WatchError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        envelope.data.ok_or(WatchError::Api {
            code: 0,
            message: "response carried no data".into(),
        })
    }

    /// The single most recent upload of the given account.
    pub async fn latest_video(&self, mid: u64) -> Result<VideoSnapshot, WatchError> {
        let url = format!("{}/x/space/arc/search?mid={}&ps=1&pn=1", self.api_base, mid);
        let data: VideoList = self.get_json(url).await?;
        data.list.vlist.into_iter().next().ok_or(WatchError::NoContent)
    }

    pub async fn account_summary(&self, mid: u64) -> Result<AccountSummary, WatchError> {
        let url = format!("{}/x/web-interface/card?mid={}", self.api_base, mid);
        self.get_json(url).await
    }

    /// Request a fresh QR login challenge from the passport service.
    pub async fn issue_login_challenge(&self) -> Result<(String, String), WatchError> {
        let url = format!("{}/x/passport-login/web/qrcode/generate", self.passport_base);
        let data: QrGenerate = self
            .get_json(url)
            .await
            .map_err(|err| WatchError::Challenge(err.to_string()))?;
        Ok((data.qrcode_key, data.url))
    }

    /// Poll the confirmation state of a QR challenge once. When the poll
    /// reports confirmation, the session cookies from the response headers
    /// become the live credential.
    pub async fn poll_login(&self, qrcode_key: &str) -> Result<QrPoll, WatchError> {
        let url = format!(
            "{}/x/passport-login/web/qrcode/poll?qrcode_key={}",
            self.passport_base, qrcode_key
        );
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let cookie = collect_cookies(response.headers());
        let envelope: ApiResponse<QrPoll> = response.json().await?;
        if envelope.code != 0 {
            return Err(WatchError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        let poll = envelope.data.ok_or(WatchError::Api {
            code: 0,
            message: "response carried no data".into(),
        })?;
        if poll.code == QR_CONFIRMED {
            self.set_credential(SessionCredential::new(cookie)).await;
        }
        Ok(poll)
    }
}

fn collect_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
