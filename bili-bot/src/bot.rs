use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, BotCommand, ChatId, UpdateKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use bili_core::{Config, Event, LoginFlow, UpdateDetector};

use crate::handlers;

/// Everything a command handler needs.
#[derive(Clone)]
pub struct BotContext {
    pub bot: Bot,
    pub detector: UpdateDetector,
    pub flow: LoginFlow,
}

/// Connect the bot, register its command list and run the update loop
/// until `cancel` fires.
pub async fn run(
    config: &Config,
    detector: UpdateDetector,
    flow: LoginFlow,
    updates: mpsc::Receiver<Event>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    // client timeout must outlast the 30s long-poll timeout
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    let bot = Bot::with_client(&config.token, client);

    // clear any stale webhook so long polling works
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("login", "Get the login QR code"),
        BotCommand::new("check", "Check the latest video"),
        BotCommand::new("logout", "Drop the saved session"),
    ];
    if let Err(err) = bot.set_my_commands(commands).await {
        warn!(%err, "failed to register bot commands");
    }

    info!("telegram bot connected");

    spawn_forwarder(bot.clone(), config.admins.clone(), updates);

    let ctx = BotContext {
        bot: bot.clone(),
        detector,
        flow,
    };

    let mut offset: i32 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("update loop stopped");
                break;
            }
            result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message])
                .send() =>
            {
                match result {
                    Ok(updates) => {
                        for update in updates {
                            offset = update.id.as_offset();
                            if let UpdateKind::Message(message) = update.kind {
                                debug!(chat_id = message.chat.id.0, "received telegram message");
                                if let Err(err) = handlers::handle_message(&ctx, message).await {
                                    error!(%err, "error handling telegram message");
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!(%err, "telegram getUpdates failed");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }

    Ok(())
}

/// Deliver poller announcements to every admin chat, best effort: one
/// failed recipient does not block the rest.
fn spawn_forwarder(bot: Bot, admins: Vec<i64>, mut updates: mpsc::Receiver<Event>) {
    tokio::spawn(async move {
        while let Some(Event::Announcement(text)) = updates.recv().await {
            for &chat_id in &admins {
                if let Err(err) = bot.send_message(ChatId(chat_id), text.clone()).await {
                    warn!(chat_id, %err, "failed to deliver announcement");
                }
            }
        }
    });
}
