use std::sync::Arc;

use teloxide::prelude::*;

use crate::bot::callback_data::{AdminAction, CallbackAction, MenuAction};
use crate::bot::commands::{admin, broadcast, orders, price, reviews, start, stats, support};
use crate::bot::handlers::{order_wizard, payment};
use crate::bot::{callback_chat_id, report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::OrderStatus;
use crate::utils::logging::{log_command_start, Actor};

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    dialogue: BotDialogue,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(Some(&q.from));
    let chat_id = callback_chat_id(&q);
    let data = q.data.clone().unwrap_or_default();

    let action = match data.parse::<CallbackAction>() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Unparseable callback '{}' from user {}: {}", data, actor.telegram_id, e);
            bot.answer_callback_query(q.id.clone())
                .text("Unknown action")
                .await?;
            return Ok(());
        }
    };

    bot.answer_callback_query(q.id.clone()).await?;
    log_command_start("callback", &actor, Some(&data));

    if action.is_admin() && !admin::ensure_admin(&bot, chat_id, &config, &actor, &data).await? {
        return Ok(());
    }

    let result = dispatch(&bot, &q, chat_id, &dialogue, &db, &config, &actor, action).await;
    match result {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, chat_id, &data, &actor, e).await,
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    bot: &Bot,
    q: &CallbackQuery,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    config: &Config,
    actor: &Actor,
    action: CallbackAction,
) -> HandlerResult {
    match action {
        CallbackAction::Menu(menu) => match menu {
            MenuAction::Main => {
                order_wizard::discard_state(dialogue).await?;
                start::show_main_menu(bot, chat_id).await?;
            }
            MenuAction::NewOrder => order_wizard::start_order(bot, chat_id, dialogue).await?,
            MenuAction::Price => price::handle_price(bot, chat_id).await?,
            MenuAction::Orders => orders::handle_orders(bot, chat_id, db, actor.telegram_id).await?,
            MenuAction::Support => support::handle_support(bot, chat_id, dialogue, config).await?,
            MenuAction::Reviews => reviews::handle_reviews(bot, chat_id, db).await?,
        },
        CallbackAction::Cancel => order_wizard::cancel(bot, chat_id, dialogue).await?,
        CallbackAction::WorkType(work_type) => {
            order_wizard::choose_work_type(bot, chat_id, dialogue, work_type).await?
        }
        CallbackAction::LeaveReview => reviews::start_review(bot, chat_id, dialogue).await?,
        CallbackAction::Rate(rating) => reviews::choose_rating(bot, chat_id, dialogue, rating).await?,
        CallbackAction::Pay(order_id) => {
            payment::start_payment(bot, chat_id, dialogue, db, config, actor, order_id).await?
        }
        CallbackAction::Admin(action) => {
            admin_action(bot, q, chat_id, dialogue, db, actor, action).await?
        }
    }
    Ok(())
}

async fn admin_action(
    bot: &Bot,
    q: &CallbackQuery,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    actor: &Actor,
    action: AdminAction,
) -> HandlerResult {
    match action {
        AdminAction::Panel => {
            dialogue.exit().await?;
            admin::handle_admin(bot, chat_id).await?;
        }
        AdminAction::NewOrders => admin::list_new_orders(bot, chat_id, db).await?,
        AdminAction::Stats => stats::handle_stats(bot, chat_id, db).await?,
        AdminAction::Broadcast => broadcast::prompt_broadcast(bot, chat_id, dialogue).await?,
        AdminAction::Reviews => admin::list_reviews(bot, chat_id, db).await?,
        AdminAction::Messages => admin::list_messages(bot, chat_id, db).await?,
        AdminAction::Accept(order_id) => {
            admin::request_price(bot, chat_id, dialogue, db, order_id).await?
        }
        AdminAction::Reject(order_id) => {
            admin::change_order_status(bot, chat_id, db, actor, order_id, OrderStatus::Cancelled).await?
        }
        AdminAction::StartWork(order_id) => {
            admin::change_order_status(bot, chat_id, db, actor, order_id, OrderStatus::InProgress).await?
        }
        AdminAction::Complete(order_id) => {
            admin::change_order_status(bot, chat_id, db, actor, order_id, OrderStatus::Completed).await?
        }
        AdminAction::ReplyReview(review_id) => {
            admin::request_review_reply(bot, chat_id, dialogue, db, review_id).await?
        }
        AdminAction::ReplyMessage(message_id) => {
            admin::request_message_reply(bot, chat_id, dialogue, db, message_id).await?
        }
        AdminAction::ConfirmPayment(payment_id) => {
            payment::confirm_payment(bot, chat_id, q.message.as_ref(), db, actor, payment_id).await?
        }
        AdminAction::RejectPayment(payment_id) => {
            payment::reject_payment(bot, chat_id, q.message.as_ref(), db, actor, payment_id).await?
        }
    }
    Ok(())
}
