//! Text the admin types after pressing a panel button.

use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::commands::admin::{self, ReplyTarget};
use crate::bot::commands::broadcast;
use crate::bot::{report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::Actor;

enum AdminInput {
    Price(i64),
    Broadcast,
    Reply(ReplyTarget),
}

impl AdminInput {
    fn operation(&self) -> &'static str {
        match self {
            AdminInput::Price(_) => "set_price",
            AdminInput::Broadcast => "broadcast",
            AdminInput::Reply(_) => "admin_reply",
        }
    }
}

async fn dispatch(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
    input: AdminInput,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    let chat_id = msg.chat.id;
    let operation = input.operation();

    // The state may outlive an admin id change in the environment.
    if !admin::ensure_admin(&bot, chat_id, &config, &actor, operation).await? {
        dialogue.exit().await?;
        return Ok(());
    }

    let Some(text) = msg.text() else {
        CommandFeedback::new(bot.clone(), chat_id)
            .validation_error("Please send a text message.", "Use /cancel to stop.")
            .await?;
        return Ok(());
    };

    let result = match input {
        AdminInput::Price(order_id) => {
            admin::apply_price(&bot, chat_id, &dialogue, &db, &actor, order_id, text).await
        }
        AdminInput::Broadcast => {
            broadcast::run_broadcast(&bot, chat_id, &dialogue, &db, &actor, text).await
        }
        AdminInput::Reply(target) => {
            admin::send_reply(&bot, chat_id, &dialogue, &db, &actor, target, text).await
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, chat_id, operation, &actor, e).await,
    }
}

pub async fn receive_price(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    order_id: i64,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    dispatch(bot, msg, dialogue, db, config, AdminInput::Price(order_id)).await
}

pub async fn receive_broadcast(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    dispatch(bot, msg, dialogue, db, config, AdminInput::Broadcast).await
}

pub async fn receive_review_reply(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    review_id: i64,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    dispatch(bot, msg, dialogue, db, config, AdminInput::Reply(ReplyTarget::Review(review_id))).await
}

pub async fn receive_message_reply(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    message_id: i64,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    dispatch(bot, msg, dialogue, db, config, AdminInput::Reply(ReplyTarget::Message(message_id))).await
}
