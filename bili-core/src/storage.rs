use std::path::PathBuf;

use tokio::fs;

use crate::models::SessionCredential;

/// Durable storage for the session credential: one small JSON file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the persisted credential. A missing or unreadable file yields
    /// the empty (unauthenticated) credential.
    pub async fn load(&self) -> SessionCredential {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
            Err(_) => SessionCredential::default(),
        }
    }

    pub async fn save(&self, credential: &SessionCredential) -> Result<(), std::io::Error> {
        let bytes = serde_json::to_vec_pretty(credential).expect("serialize credential");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.ok();
        }
        // atomic write
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
