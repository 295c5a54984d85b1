pub mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod models;
pub mod poller;
pub mod session;
pub mod storage;

pub use client::BiliClient;
pub use config::Config;
pub use detector::{same_magnitude, UpdateDetector};
pub use error::WatchError;
pub use models::{AccountSummary, LoginChallenge, SessionCredential, VideoSnapshot};
pub use poller::{spawn_poller, Event, PollConfig, PollerHandle};
pub use session::LoginFlow;
pub use storage::CredentialStore;
