use teloxide::prelude::*;
use teloxide::types::{InputFile, Message};
use tracing::warn;

use crate::bot::BotContext;

/// Route one inbound message. Each command produces exactly one direct
/// reply; errors become the reply text.
pub async fn handle_message(ctx: &BotContext, message: Message) -> anyhow::Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    match text.trim() {
        "/check" => check(ctx, &message).await,
        "/login" => login(ctx, &message).await,
        "/logout" => logout(ctx, &message).await,
        _ => Ok(()),
    }
}

async fn check(ctx: &BotContext, message: &Message) -> anyhow::Result<()> {
    let reply = match ctx.detector.evaluate(true).await {
        Ok(text) => text,
        Err(err) => err.to_string(),
    };
    ctx.bot.send_message(message.chat.id, reply).await?;
    Ok(())
}

async fn login(ctx: &BotContext, message: &Message) -> anyhow::Result<()> {
    let challenge = match ctx.flow.begin().await {
        Ok(challenge) => challenge,
        Err(err) => {
            ctx.bot.send_message(message.chat.id, err.to_string()).await?;
            return Ok(());
        }
    };

    let photo = InputFile::memory(challenge.png.clone()).file_name("qr.png");
    let qr_message = ctx.bot.send_photo(message.chat.id, photo).await?;

    // wait out the confirmation on its own task so the command returns now
    let bot = ctx.bot.clone();
    let flow = ctx.flow.clone();
    let chat_id = message.chat.id;
    tokio::spawn(async move {
        let outcome = flow.confirm(&challenge).await;
        // the QR is stale once the flow resolves, either way
        if let Err(err) = bot.delete_message(chat_id, qr_message.id).await {
            warn!(%err, "failed to delete qr message");
        }
        let text = match outcome {
            Ok(()) => "Login succeeded.".to_string(),
            Err(err) => format!("Login failed: {err}"),
        };
        if let Err(err) = bot.send_message(chat_id, text).await {
            warn!(%err, "failed to deliver login outcome");
        }
    });

    Ok(())
}

async fn logout(ctx: &BotContext, message: &Message) -> anyhow::Result<()> {
    ctx.flow.logout().await;
    ctx.bot.send_message(message.chat.id, "Logged out.").await?;
    Ok(())
}
