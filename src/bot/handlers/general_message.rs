use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::commands::{reviews, support};
use crate::bot::{report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_validation_error, Actor};

/// Slash-prefixed text; known commands are matched before this is checked.
pub fn looks_like_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Hint for text that looks like a command the bot does not know.
pub fn unknown_command_hint(text: &str) -> Option<String> {
    if !looks_like_command(text) {
        return None;
    }
    let command = text.split_whitespace().next().unwrap_or(text);
    Some(format!("Unknown command: {command}"))
}

/// Answers a mistyped command in any state. The dialogue stays where it
/// was, so the text is never taken as the answer to the current step.
pub async fn reject_unknown_command(bot: Bot, msg: Message) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    let text = msg.text().unwrap_or_default();
    let Some(error) = unknown_command_hint(text) else {
        return Ok(());
    };

    log_validation_error("command", text, "unknown command", &actor);
    CommandFeedback::new(bot, msg.chat.id)
        .validation_error(&error, "Use /help to see all commands or /cancel to stop the current step.")
        .await?;
    Ok(())
}

/// Steps that are answered with an inline button, not with text.
pub async fn expect_button(bot: Bot, msg: Message) -> HandlerResult {
    CommandFeedback::new(bot, msg.chat.id)
        .info("Please choose one of the buttons above, or use /cancel.")
        .await?;
    Ok(())
}

pub async fn receive_support_message(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    match support::submit_support_message(&bot, &msg, &dialogue, &db, &config).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "support_message", &actor, e).await,
    }
}

pub async fn receive_review(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    rating: Option<i64>,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    match reviews::submit_review(&bot, &msg, &dialogue, &db, &config, rating).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "review", &actor, e).await,
    }
}

/// Messages outside any dialogue.
///
/// A student's free text goes to the admin as a support message; the admin
/// gets pointed at the panel instead.
pub async fn handle_free_text(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    if msg.text().is_none() {
        feedback
            .info("Use /start to open the menu or /order to place an order.")
            .await?;
        return Ok(());
    }

    if config.is_admin(actor.telegram_id) {
        feedback
            .info("Use /admin to open the admin panel.")
            .await?;
        return Ok(());
    }

    match support::submit_support_message(&bot, &msg, &dialogue, &db, &config).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "support_message", &actor, e).await,
    }
}
