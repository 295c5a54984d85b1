use std::time::Duration;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Luma};
use qrcode::QrCode;
use tracing::{debug, info, warn};

use crate::client::{BiliClient, QR_CONFIRMED, QR_EXPIRED};
use crate::error::WatchError;
use crate::models::{LoginChallenge, SessionCredential};
use crate::storage::CredentialStore;

// The platform invalidates a QR challenge after about three minutes.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(180);
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Brokers the QR login handshake: issue a challenge, wait for the remote
/// side to confirm it, and keep the credential store in sync with the live
/// session.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    client: BiliClient,
    store: CredentialStore,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl LoginFlow {
    pub fn new(client: BiliClient, store: CredentialStore) -> Self {
        Self {
            client,
            store,
            confirm_timeout: CONFIRM_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the confirmation wait bounds (used by tests).
    pub fn with_wait(mut self, confirm_timeout: Duration, poll_interval: Duration) -> Self {
        self.confirm_timeout = confirm_timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Issue a fresh QR challenge and render it as a PNG for display.
    /// Returns immediately; the caller decides when to start waiting for
    /// confirmation.
    pub async fn begin(&self) -> Result<LoginChallenge, WatchError> {
        let (qrcode_key, url) = self.client.issue_login_challenge().await?;
        let png = render_qr_png(&url)?;
        Ok(LoginChallenge {
            qrcode_key,
            url,
            png,
        })
    }

    /// Block until the challenge is scanned and approved, or fails.
    ///
    /// Meant to run on its own task so the command that triggered the login
    /// is not held up. On confirmation the credential the client now holds
    /// is persisted; a persistence failure is logged and does not fail the
    /// login. On any failure the credential is left untouched and nothing
    /// is written.
    pub async fn confirm(&self, challenge: &LoginChallenge) -> Result<(), WatchError> {
        let wait = self.poll_until_resolved(&challenge.qrcode_key);
        match tokio::time::timeout(self.confirm_timeout, wait).await {
            Ok(result) => result?,
            Err(_) => return Err(WatchError::LoginTimeout),
        }

        let credential = self.client.credential().await;
        if let Err(err) = self.store.save(&credential).await {
            warn!(%err, "failed to persist session credential");
        }
        info!("login confirmed");
        Ok(())
    }

    async fn poll_until_resolved(&self, qrcode_key: &str) -> Result<(), WatchError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            let poll = self.client.poll_login(qrcode_key).await?;
            match poll.code {
                QR_CONFIRMED => return Ok(()),
                QR_EXPIRED => return Err(WatchError::LoginExpired),
                code => debug!(code, "qr not confirmed yet"),
            }
        }
    }

    /// Drop the live credential and persist the cleared state. The in-memory
    /// clear is unconditional; a persistence failure is only logged.
    pub async fn logout(&self) {
        self.client.set_credential(SessionCredential::default()).await;
        if let Err(err) = self.store.save(&SessionCredential::default()).await {
            warn!(%err, "failed to persist cleared credential");
        }
        info!("logged out");
    }
}

fn render_qr_png(url: &str) -> Result<Vec<u8>, WatchError> {
    let code = QrCode::new(url.as_bytes()).map_err(|err| WatchError::Qr(err.to_string()))?;
    let image = code.render::<Luma<u8>>().min_dimensions(320, 320).build();
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .map_err(|err| WatchError::Qr(err.to_string()))?;
    Ok(png)
}
