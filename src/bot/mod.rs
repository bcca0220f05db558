pub mod callback_data;
pub mod commands;
pub mod handlers;
pub mod keyboards;
pub mod state;

use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;

use crate::database::connection::DatabaseManager;
use crate::database::models::{TelegramProfile, User};
use crate::utils::feedback::CommandFeedback;
use crate::utils::logging::{log_command_error, log_database_error, log_database_operation, Actor};

pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type HandlerResult = Result<(), HandlerError>;
pub type BotDialogue = Dialogue<state::State, InMemStorage<state::State>>;

/// Chat a callback query should be answered in.
///
/// Inline buttons in this bot live in private chats, where the chat id
/// equals the user id, so that is the fallback for queries without a message.
pub fn callback_chat_id(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map_or(ChatId(q.from.id.0 as i64), |m| m.chat.id)
}

/// Stores or refreshes the Telegram user behind an update.
pub async fn register_user(
    db: &DatabaseManager,
    user: &teloxide::types::User,
) -> Result<User, sqlx::Error> {
    let profile = TelegramProfile::from_user(user);
    match User::upsert(&db.pool, &profile).await {
        Ok(stored) => {
            log_database_operation("upsert", "users", &format!("telegram_id={}", stored.telegram_id));
            Ok(stored)
        }
        Err(e) => {
            log_database_error("upsert", "users", &e.to_string());
            Err(e)
        }
    }
}

/// Logs a failed handler and tells the user something went wrong.
///
/// Used at the top of every endpoint so a database or network error never
/// leaves the user without an answer.
pub async fn report_failure(
    bot: &Bot,
    chat_id: ChatId,
    operation: &str,
    actor: &Actor,
    error: HandlerError,
) -> HandlerResult {
    log_command_error(operation, actor, &error.to_string());
    CommandFeedback::new(bot.clone(), chat_id).generic_failure().await?;
    Ok(())
}
