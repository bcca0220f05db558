//! Manual card-transfer payments: instructions, proof upload and the
//! admin's confirm / reject decision.

use std::sync::Arc;

use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};

use crate::bot::commands::admin::status_notice;
use crate::bot::commands::price::format_rubles;
use crate::bot::state::State;
use crate::bot::{keyboards, report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{Confirmation, Order, OrderStatus, Payment, PaymentStatus, User};
use crate::services::files::{download_to_dir, Attachment};
use crate::utils::feedback::{notify, CommandFeedback};
use crate::utils::logging::{log_command_success, log_notification_failure, log_validation_error, Actor};
use crate::utils::markdown::MarkdownText;

pub fn payment_instructions(order: &Order, card: &str) -> String {
    let amount = format_rubles(order.price);
    MarkdownText::new()
        .title(&format!("💰 Payment for order #{}", order.id))
        .blank()
        .field("Amount due", &format!("{amount} ₽"))
        .blank()
        .line(&format!("1. Transfer {amount} ₽ to the card:"))
        .line(&format!("💳 {card}"))
        .blank()
        .line("2. After paying, send a photo or screenshot of the receipt here.")
        .build()
}

/// Pay button: checks the order, opens a payment and waits for the proof.
pub async fn start_payment(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    config: &Config,
    actor: &Actor,
    order_id: i64,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let order = Order::find_by_id(&db.pool, order_id).await?;
    let owner = User::find_by_telegram_id(&db.pool, actor.telegram_id).await?;
    let order = match (order, owner) {
        (Some(order), Some(owner)) if order.user_id == owner.id => order,
        (Some(_), _) => {
            feedback.error("You don't have access to this order.").await?;
            return Ok(());
        }
        (None, _) => {
            feedback.error(&format!("Order #{order_id} not found.")).await?;
            return Ok(());
        }
    };

    if order.status != OrderStatus::Pending {
        feedback
            .warning(&format!("Order #{} is already paid or cancelled.", order.id))
            .await?;
        return Ok(());
    }
    if !order.is_payable() {
        feedback
            .warning("The admin has not set the price for this order yet. You will get a Pay button once it is set.")
            .await?;
        return Ok(());
    }

    let payment = Payment::start_for_order(&db.pool, &order).await?;
    dialogue
        .update(State::PaymentProof { order_id: order.id, payment_id: payment.id })
        .await?;

    bot.send_message(chat_id, payment_instructions(&order, &config.payment_card))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::cancel())
        .await?;

    log_command_success(
        "payment_start",
        actor,
        Some(&format!("order_id={} payment_id={}", order.id, payment.id)),
    );
    Ok(())
}

pub async fn receive_proof(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    (order_id, payment_id): (i64, i64),
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    match store_proof(&bot, &msg, &dialogue, order_id, payment_id, &db, &config, &actor).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "payment_proof", &actor, e).await,
    }
}

fn proof_caption(order: &Order, customer: &str) -> String {
    MarkdownText::new()
        .title(&format!("💰 Payment proof for order #{}", order.id))
        .field("From", customer)
        .field("Amount", &format!("{} ₽", format_rubles(order.price)))
        .build()
}

#[allow(clippy::too_many_arguments)]
async fn store_proof(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    order_id: i64,
    payment_id: i64,
    db: &DatabaseManager,
    config: &Config,
    actor: &Actor,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let Some(attachment) = Attachment::from_message(msg) else {
        log_validation_error("payment_proof", msg.text().unwrap_or("<non-text>"), "no file", actor);
        feedback
            .validation_error(
                "Please send a photo or a file confirming the payment.",
                "Use /cancel to stop the payment.",
            )
            .await?;
        return Ok(());
    };

    let payment = Payment::find_by_id(&db.pool, payment_id).await?;
    let order = Order::find_by_id(&db.pool, order_id).await?;
    let (Some(payment), Some(order)) = (payment, order) else {
        dialogue.exit().await?;
        feedback.error("The payment could not be found. Please press Pay again.").await?;
        return Ok(());
    };
    if payment.status != PaymentStatus::Pending || !order.is_payable() {
        dialogue.exit().await?;
        feedback
            .warning(&format!("Payment for order #{} is no longer awaiting a receipt.", order.id))
            .await?;
        return Ok(());
    }

    let name = attachment.storage_name(Local::now());
    let path = match download_to_dir(bot, attachment.file_id(), &config.payment_proofs_dir, &name).await {
        Ok(path) => path,
        Err(e) => {
            tracing::error!("Failed to save payment proof: {:#}", e);
            feedback
                .error("Could not save the receipt. Please send it again.")
                .await?;
            return Ok(());
        }
    };
    Payment::attach_proof(&db.pool, payment.id, &path.to_string_lossy()).await?;
    dialogue.exit().await?;

    bot.send_message(
        msg.chat.id,
        "✅ Payment receipt received!\nThe admin will check the payment and confirm it shortly.",
    )
    .reply_markup(keyboards::main_menu())
    .await?;

    let customer = User::find_by_id(&db.pool, order.user_id)
        .await?
        .map_or_else(|| format!("user #{}", order.user_id), |u| u.display_name());
    let caption = proof_caption(&order, &customer);
    let admin = ChatId(config.admin_id);
    let file = InputFile::file_id(attachment.file_id());

    let forwarded = if attachment.is_photo() {
        bot.send_photo(admin, file)
            .caption(caption)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboards::payment_review(payment.id))
            .await
            .map(|_| ())
    } else {
        bot.send_document(admin, file)
            .caption(caption)
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboards::payment_review(payment.id))
            .await
            .map(|_| ())
    };
    if let Err(e) = forwarded {
        log_notification_failure(config.admin_id, "payment proof", &e.to_string());
    }

    log_command_success(
        "payment_proof",
        actor,
        Some(&format!("order_id={} payment_id={}", order.id, payment.id)),
    );
    Ok(())
}

/// Removes the Confirm / Reject buttons from the proof the admin answered.
async fn close_review_buttons(bot: &Bot, source: Option<&Message>) {
    if let Some(message) = source {
        if let Err(e) = bot.edit_message_reply_markup(message.chat.id, message.id).await {
            tracing::debug!("Could not remove payment buttons: {}", e);
        }
    }
}

pub async fn confirm_payment(
    bot: &Bot,
    chat_id: ChatId,
    source: Option<&Message>,
    db: &DatabaseManager,
    actor: &Actor,
    payment_id: i64,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let order = match Payment::confirm(&db.pool, payment_id).await? {
        Confirmation::Confirmed(order) => order,
        Confirmation::NotFound => {
            feedback.error(&format!("Payment #{payment_id} not found.")).await?;
            return Ok(());
        }
        Confirmation::PaymentNotPending(status) => {
            feedback
                .warning(&format!("Payment #{payment_id} is already {status}."))
                .await?;
            return Ok(());
        }
        Confirmation::OrderNotPayable(current) => {
            feedback
                .warning(&format!(
                    "The order is {} and cannot be marked as paid. Reject the payment instead.",
                    current.label().to_lowercase()
                ))
                .await?;
            return Ok(());
        }
    };
    close_review_buttons(bot, source).await;

    if let Some(customer) = User::find_by_id(&db.pool, order.user_id).await? {
        notify(
            bot,
            ChatId(customer.telegram_id),
            status_notice(&order),
            Some(keyboards::main_menu()),
            "payment confirmed",
        )
        .await;
    }

    log_command_success(
        "payment_confirm",
        actor,
        Some(&format!("order_id={} payment_id={}", order.id, payment_id)),
    );
    bot.send_message(chat_id, format!("✅ Payment for order #{} confirmed.", order.id))
        .reply_markup(keyboards::order_admin(&order).unwrap_or_else(keyboards::admin_panel))
        .await?;
    Ok(())
}

fn rejection_notice(order_id: i64) -> String {
    MarkdownText::new()
        .line(&format!("❌ Payment for order #{order_id} was rejected."))
        .blank()
        .line("Please check the transfer details and try again.")
        .build()
}

pub async fn reject_payment(
    bot: &Bot,
    chat_id: ChatId,
    source: Option<&Message>,
    db: &DatabaseManager,
    actor: &Actor,
    payment_id: i64,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let Some(payment) = Payment::find_by_id(&db.pool, payment_id).await? else {
        feedback.error(&format!("Payment #{payment_id} not found.")).await?;
        return Ok(());
    };
    if !Payment::set_status(&db.pool, payment.id, PaymentStatus::Failed).await? {
        feedback
            .warning(&format!("Payment #{} is already {}.", payment.id, payment.status))
            .await?;
        return Ok(());
    }
    close_review_buttons(bot, source).await;

    if let Some(customer) = User::find_by_id(&db.pool, payment.user_id).await? {
        notify(
            bot,
            ChatId(customer.telegram_id),
            rejection_notice(payment.order_id),
            Some(keyboards::pay(payment.order_id)),
            "payment rejected",
        )
        .await;
    }

    log_command_success(
        "payment_reject",
        actor,
        Some(&format!("order_id={} payment_id={}", payment.order_id, payment.id)),
    );
    bot.send_message(chat_id, format!("❌ Payment for order #{} rejected.", payment.order_id))
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::WorkType;

    #[test]
    fn test_payment_instructions() {
        let order = Order {
            id: 9,
            user_id: 1,
            work_type: WorkType::Essay,
            subject: "History".to_string(),
            volume: "10".to_string(),
            deadline: "2025-04-01".to_string(),
            status: OrderStatus::Pending,
            price: 1800.0,
            price_set_at: Some("2025-03-01T12:00:00+00:00".to_string()),
            file_id: None,
            file_path: None,
            comment: None,
            contact_info: "@student".to_string(),
            reminder_sent_at: None,
            created_at: "2025-03-01T10:00:00+00:00".to_string(),
            updated_at: "2025-03-01T10:00:00+00:00".to_string(),
        };

        let text = payment_instructions(&order, "2202 2050 0031 5959");
        assert!(text.contains("Payment for order \\#9"));
        assert!(text.contains("*Amount due:* 1800 ₽"));
        assert!(text.contains("💳 2202 2050 0031 5959"));
    }

    #[test]
    fn test_rejection_notice() {
        assert!(rejection_notice(4).contains("order \\#4 was rejected\\."));
    }
}
