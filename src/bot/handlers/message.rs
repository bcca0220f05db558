use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::commands::{admin, broadcast, orders, price, reviews, start, stats, support, Command};
use crate::bot::handlers::order_wizard;
use crate::bot::{report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::utils::logging::{log_command_start, log_command_success, Actor};

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    let chat_id = msg.chat.id;
    let name = cmd.name();

    log_command_start(name, &actor, None);

    if cmd.requires_admin() && !admin::ensure_admin(&bot, chat_id, &config, &actor, name).await? {
        return Ok(());
    }

    let result: HandlerResult = match cmd {
        Command::Help => start::handle_help(&bot, chat_id).await.map_err(Into::into),
        Command::Start => {
            order_wizard::discard_state(&dialogue).await?;
            start::handle_start(&bot, &msg, &db).await
        }
        Command::Price => price::handle_price(&bot, chat_id).await.map_err(Into::into),
        Command::Order => order_wizard::start_order(&bot, chat_id, &dialogue).await,
        Command::Orders => orders::handle_orders(&bot, chat_id, &db, actor.telegram_id).await,
        Command::Support => support::handle_support(&bot, chat_id, &dialogue, &config).await,
        Command::Reviews => reviews::handle_reviews(&bot, chat_id, &db).await,
        Command::Cancel => order_wizard::cancel(&bot, chat_id, &dialogue).await,
        Command::Admin => admin::handle_admin(&bot, chat_id).await.map_err(Into::into),
        Command::Stats => stats::handle_stats(&bot, chat_id, &db).await,
        Command::Broadcast(text) => {
            broadcast::handle_broadcast(&bot, chat_id, &dialogue, &db, &actor, &text).await
        }
    };

    match result {
        Ok(()) => {
            log_command_success(name, &actor, None);
            Ok(())
        }
        Err(e) => report_failure(&bot, chat_id, name, &actor, e).await,
    }
}
