mod bot;
mod handlers;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bili_core::{
    spawn_poller, BiliClient, Config, CredentialStore, LoginFlow, PollConfig, UpdateDetector,
};

#[derive(Debug, Parser)]
#[command(name = "bili-bot", about = "Watches a Bilibili creator and announces new videos")]
struct Args {
    /// Config file path or URL.
    #[arg(long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = Config::load(&args.config)
        .await
        .context("failed to load config")?;

    let client = BiliClient::new().context("failed to build platform client")?;
    let store = CredentialStore::new(&config.cache_store);
    let credential = store.load().await;
    if !credential.is_empty() {
        client.set_credential(credential).await;
        info!("restored session credential from {}", config.cache_store.display());
    }

    let detector = UpdateDetector::new(client.clone(), config.mid);
    let flow = LoginFlow::new(client.clone(), store);

    let (update_tx, update_rx) = tokio::sync::mpsc::channel(16);
    let poller = spawn_poller(
        client,
        detector.clone(),
        PollConfig {
            interval: config.poll_interval(),
        },
        update_tx,
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }

    bot::run(&config, detector, flow, update_rx, cancel).await?;

    poller.stop().await.context("failed to stop poller")?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
