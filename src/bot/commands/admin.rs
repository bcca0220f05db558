use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::commands::orders::admin_order_card;
use crate::bot::commands::price::format_rubles;
use crate::bot::state::State;
use crate::bot::{keyboards, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::datetime::format_timestamp;
use crate::utils::feedback::{notify, CommandFeedback};
use crate::utils::logging::{
    log_access_denied, log_command_success, log_database_operation, log_validation_error, Actor,
};
use crate::utils::markdown::MarkdownText;
use crate::utils::validation::{parse_price, validate_text};

/// Reviews and support messages listed in the admin panel.
pub const ADMIN_LIST_LIMIT: i64 = 20;

/// Room for each of the text and the reply on an inbox card.
const CARD_ENTRY_BUDGET: usize = 1700;
const NOTICE_TEXT_BUDGET: usize = 3500;

/// Replies with an access-denied message unless `actor` is the admin.
pub async fn ensure_admin(
    bot: &Bot,
    chat_id: ChatId,
    config: &Config,
    actor: &Actor,
    operation: &str,
) -> ResponseResult<bool> {
    if config.is_admin(actor.telegram_id) {
        return Ok(true);
    }

    log_access_denied(operation, actor);
    CommandFeedback::new(bot.clone(), chat_id).denied().await?;
    Ok(false)
}

pub async fn handle_admin(bot: &Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(chat_id, "👨‍💼 Admin panel\n\nChoose an action:")
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

async fn send_order_card(bot: &Bot, chat_id: ChatId, db: &DatabaseManager, order: &Order, heading: &str) -> HandlerResult {
    let customer = User::find_by_id(&db.pool, order.user_id).await?;
    let mut request = bot
        .send_message(chat_id, admin_order_card(order, customer.as_ref(), heading))
        .parse_mode(ParseMode::MarkdownV2);
    if let Some(keyboard) = keyboards::order_admin(order) {
        request = request.reply_markup(keyboard);
    }
    request.await?;
    Ok(())
}

pub async fn list_new_orders(bot: &Bot, chat_id: ChatId, db: &DatabaseManager) -> HandlerResult {
    let orders = Order::find_by_status(&db.pool, OrderStatus::Pending).await?;
    log_database_operation("select_pending", "orders", &format!("{} found", orders.len()));

    if orders.is_empty() {
        bot.send_message(chat_id, "📭 No new orders.")
            .reply_markup(keyboards::admin_panel())
            .await?;
        return Ok(());
    }

    for order in &orders {
        if let Err(e) = send_order_card(bot, chat_id, db, order, "🆕 New order").await {
            tracing::warn!("Skipping order #{} card: {}", order.id, e);
        }
    }

    bot.send_message(chat_id, "Choose an action:")
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

/// Accept button: asks for the final price.
pub async fn request_price(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    order_id: i64,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let Some(order) = Order::find_by_id(&db.pool, order_id).await? else {
        feedback.error(&format!("Order #{order_id} not found.")).await?;
        return Ok(());
    };
    if order.status != OrderStatus::Pending {
        feedback
            .warning(&format!(
                "Order #{} is already {}, the price can no longer change.",
                order.id,
                order.status.label().to_lowercase()
            ))
            .await?;
        return Ok(());
    }

    dialogue.update(State::AdminPrice { order_id }).await?;
    bot.send_message(
        chat_id,
        format!(
            "💰 Enter the price for order #{} in rubles (base price {} ₽):",
            order.id,
            format_rubles(order.price)
        ),
    )
    .reply_markup(keyboards::cancel())
    .await?;
    Ok(())
}

fn price_notice(order_id: i64, price: f64) -> String {
    MarkdownText::new()
        .title(&format!("✅ Your order #{order_id} has been accepted!"))
        .field("Price", &format!("{} ₽", format_rubles(price)))
        .blank()
        .line("To confirm the order, proceed to payment:")
        .build()
}

/// Price input: the student is notified first and the price is stored only
/// once the notification went through.
pub async fn apply_price(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    actor: &Actor,
    order_id: i64,
    input: &str,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let price = match parse_price(input) {
        Ok(price) => price,
        Err(e) => {
            log_validation_error("price", input, &e.to_string(), actor);
            feedback
                .validation_error(&e.to_string(), "Enter a positive amount, for example 1500 or 1500.50")
                .await?;
            return Ok(());
        }
    };
    dialogue.exit().await?;

    let Some(order) = Order::find_by_id(&db.pool, order_id).await? else {
        feedback.error(&format!("Order #{order_id} not found.")).await?;
        return Ok(());
    };
    if order.status != OrderStatus::Pending {
        feedback
            .warning(&format!("Order #{} is no longer awaiting a price.", order.id))
            .await?;
        return Ok(());
    }
    if let Some(payment) = Payment::find_latest_by_order(&db.pool, order.id).await? {
        if payment.status == PaymentStatus::Pending && payment.proof_file.is_some() {
            feedback
                .warning(&format!(
                    "A receipt for order #{} is waiting for review. Confirm or reject it before changing the price.",
                    order.id
                ))
                .await?;
            return Ok(());
        }
    }
    let Some(customer) = User::find_by_id(&db.pool, order.user_id).await? else {
        feedback.error("The customer of this order no longer exists.").await?;
        return Ok(());
    };

    let delivered = notify(
        bot,
        ChatId(customer.telegram_id),
        price_notice(order.id, price),
        Some(keyboards::pay(order.id)),
        "price notification",
    )
    .await;
    if !delivered {
        feedback
            .error(&format!(
                "Could not notify {} (telegram id {}). The price was not saved.",
                customer.display_name(),
                customer.telegram_id
            ))
            .await?;
        return Ok(());
    }

    match Order::set_price(&db.pool, order.id, price).await? {
        PriceChange::Updated => {}
        PriceChange::NotPending => {
            feedback
                .warning(&format!("Order #{} changed status meanwhile, the price was not saved.", order.id))
                .await?;
            return Ok(());
        }
        PriceChange::PaymentUnderReview => {
            feedback
                .warning(&format!("A receipt for order #{} arrived meanwhile, the price was not saved.", order.id))
                .await?;
            return Ok(());
        }
    }

    log_command_success("set_price", actor, Some(&format!("order_id={} price={}", order.id, price)));
    bot.send_message(
        chat_id,
        format!("✅ Price set: {} ₽\nThe customer has been notified.", format_rubles(price)),
    )
    .reply_markup(keyboards::admin_panel())
    .await?;
    Ok(())
}

/// Message sent to the student when the admin moves their order.
pub fn status_notice(order: &Order) -> String {
    let text = match order.status {
        OrderStatus::Pending => format!("⏳ Your order #{} is awaiting payment.", order.id),
        OrderStatus::Paid => format!(
            "✅ Payment for order #{} is confirmed!\n\nWe will start working on it shortly.",
            order.id
        ),
        OrderStatus::InProgress => format!("⚙️ Work on your order #{} has started.", order.id),
        OrderStatus::Completed => format!(
            "🏁 Your order #{} is completed!\n\nThank you for choosing us. We would love to hear your feedback.",
            order.id
        ),
        OrderStatus::Cancelled => format!("❌ Your order #{} has been rejected.", order.id),
    };
    MarkdownText::new().line(&text).build()
}

/// Reject / Start work / Complete buttons.
pub async fn change_order_status(
    bot: &Bot,
    chat_id: ChatId,
    db: &DatabaseManager,
    actor: &Actor,
    order_id: i64,
    next: OrderStatus,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let order = match Order::transition(&db.pool, order_id, next).await? {
        StatusChange::Updated(order) => order,
        StatusChange::NotFound => {
            feedback.error(&format!("Order #{order_id} not found.")).await?;
            return Ok(());
        }
        StatusChange::Rejected { current } => {
            feedback
                .warning(&format!(
                    "Order #{} is {}, it cannot become {}.",
                    order_id,
                    current.label().to_lowercase(),
                    next.label().to_lowercase()
                ))
                .await?;
            return Ok(());
        }
    };
    log_command_success(
        "order_status",
        actor,
        Some(&format!("order_id={} status={}", order.id, order.status)),
    );

    let follow_up = match order.status {
        OrderStatus::Completed => Some(keyboards::reviews_menu()),
        _ => None,
    };
    let notified = match User::find_by_id(&db.pool, order.user_id).await? {
        Some(customer) => {
            notify(bot, ChatId(customer.telegram_id), status_notice(&order), follow_up, "status update").await
        }
        None => false,
    };

    let summary = format!("Order #{} is now {}.", order.id, order.status.label().to_lowercase());
    if notified {
        feedback.success(&summary).await?;
    } else {
        feedback
            .warning(&format!("{summary} The customer could not be notified."))
            .await?;
    }

    if !order.status.is_terminal() {
        send_order_card(bot, chat_id, db, &order, "📋 Order").await?;
    }
    Ok(())
}

fn review_card(review: &ReviewWithAuthor) -> String {
    let card = MarkdownText::new()
        .title(&format!("⭐ Review from {}", review.author()))
        .line(&format!("📅 {}", format_timestamp(&review.created_at)));
    let card = match review.rating {
        Some(rating) => card.line(&rating_stars(rating)),
        None => card,
    };
    card.clipped_line(&format!("📝 {}", review.text), CARD_ENTRY_BUDGET)
        .clipped_line(
            &format!("💬 Reply: {}", review.admin_response.as_deref().unwrap_or("none")),
            CARD_ENTRY_BUDGET,
        )
        .build()
}

pub async fn list_reviews(bot: &Bot, chat_id: ChatId, db: &DatabaseManager) -> HandlerResult {
    let reviews = Review::recent_with_authors(&db.pool, ADMIN_LIST_LIMIT).await?;

    if reviews.is_empty() {
        bot.send_message(chat_id, "📭 No reviews yet.")
            .reply_markup(keyboards::admin_panel())
            .await?;
        return Ok(());
    }

    for review in &reviews {
        if let Err(e) = bot
            .send_message(chat_id, review_card(review))
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboards::reply_review(review.id))
            .await
        {
            tracing::warn!("Skipping review #{} card: {}", review.id, e);
        }
    }

    bot.send_message(chat_id, "Choose an action:")
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

fn message_card(message: &SupportMessageWithAuthor) -> String {
    let heading = if message.is_read { "📨" } else { "🆕 📨" };
    MarkdownText::new()
        .title(&format!("{} Message from {}", heading, message.author()))
        .line(&format!("📅 {}", format_timestamp(&message.created_at)))
        .clipped_line(&format!("📝 {}", message.text), CARD_ENTRY_BUDGET)
        .clipped_line(
            &format!("💬 Reply: {}", message.admin_response.as_deref().unwrap_or("none")),
            CARD_ENTRY_BUDGET,
        )
        .build()
}

/// Shows the latest support messages and marks them as read.
pub async fn list_messages(bot: &Bot, chat_id: ChatId, db: &DatabaseManager) -> HandlerResult {
    let messages = SupportMessage::recent_with_authors(&db.pool, ADMIN_LIST_LIMIT).await?;

    if messages.is_empty() {
        bot.send_message(chat_id, "📭 No messages yet.")
            .reply_markup(keyboards::admin_panel())
            .await?;
        return Ok(());
    }

    for message in &messages {
        if let Err(e) = bot
            .send_message(chat_id, message_card(message))
            .parse_mode(ParseMode::MarkdownV2)
            .reply_markup(keyboards::reply_message(message.id))
            .await
        {
            tracing::warn!("Skipping message #{} card: {}", message.id, e);
        }
    }

    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    let marked = SupportMessage::mark_read(&db.pool, &ids).await?;
    log_database_operation("mark_read", "messages", &format!("{marked} marked read"));

    bot.send_message(chat_id, "Choose an action:")
        .reply_markup(keyboards::admin_panel())
        .await?;
    Ok(())
}

pub async fn request_review_reply(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    review_id: i64,
) -> HandlerResult {
    if Review::find_by_id(&db.pool, review_id).await?.is_none() {
        CommandFeedback::new(bot.clone(), chat_id)
            .error(&format!("Review #{review_id} not found."))
            .await?;
        return Ok(());
    }

    dialogue.update(State::AdminReviewReply { review_id }).await?;
    bot.send_message(chat_id, "💬 Enter your reply to the review:")
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

pub async fn request_message_reply(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    message_id: i64,
) -> HandlerResult {
    if SupportMessage::find_by_id(&db.pool, message_id).await?.is_none() {
        CommandFeedback::new(bot.clone(), chat_id)
            .error(&format!("Message #{message_id} not found."))
            .await?;
        return Ok(());
    }

    dialogue.update(State::AdminMessageReply { message_id }).await?;
    bot.send_message(chat_id, "💬 Enter your reply to the message:")
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

/// What the admin is replying to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTarget {
    Review(i64),
    Message(i64),
}

impl ReplyTarget {
    fn noun(&self) -> &'static str {
        match self {
            ReplyTarget::Review(_) => "review",
            ReplyTarget::Message(_) => "message",
        }
    }
}

pub fn reply_notice(target: ReplyTarget, response: &str) -> String {
    MarkdownText::new()
        .title(&format!("💬 The admin replied to your {}:", target.noun()))
        .blank()
        .clipped_line(response, NOTICE_TEXT_BUDGET)
        .build()
}

/// Stores the admin reply and forwards it to the author.
pub async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    actor: &Actor,
    target: ReplyTarget,
    input: &str,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let response = match validate_text(input, "Reply") {
        Ok(response) => response,
        Err(e) => {
            log_validation_error("admin_reply", input, &e.to_string(), actor);
            feedback
                .validation_error(&e.to_string(), "Send the reply as a text message.")
                .await?;
            return Ok(());
        }
    };
    dialogue.exit().await?;

    let author_id = match target {
        ReplyTarget::Review(id) => {
            if !Review::respond(&db.pool, id, &response).await? {
                feedback.error(&format!("Review #{id} not found.")).await?;
                return Ok(());
            }
            Review::find_by_id(&db.pool, id).await?.map(|r| r.user_id)
        }
        ReplyTarget::Message(id) => {
            if !SupportMessage::respond(&db.pool, id, &response).await? {
                feedback.error(&format!("Message #{id} not found.")).await?;
                return Ok(());
            }
            SupportMessage::find_by_id(&db.pool, id).await?.map(|m| m.user_id)
        }
    };

    let author = match author_id {
        Some(user_id) => User::find_by_id(&db.pool, user_id).await?,
        None => None,
    };
    let delivered = match &author {
        Some(author) => {
            notify(bot, ChatId(author.telegram_id), reply_notice(target, &response), None, "admin reply").await
        }
        None => false,
    };

    log_command_success("admin_reply", actor, Some(&format!("{target:?}")));
    let saved = format!("Your reply to the {} has been saved.", target.noun());
    if delivered {
        bot.send_message(chat_id, format!("✅ {saved}"))
            .reply_markup(keyboards::admin_panel())
            .await?;
    } else {
        feedback
            .warning(&format!("{saved} The author could not be notified."))
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::markdown::{text_len, MESSAGE_LIMIT};
    use crate::utils::validation::MAX_MESSAGE_LENGTH;

    #[test]
    fn test_price_notice() {
        let text = price_notice(5, 1500.5);
        assert!(text.contains("order \\#5 has been accepted\\!"));
        assert!(text.contains("*Price:* 1500\\.50 ₽"));
    }

    #[test]
    fn test_reply_notice_names_target() {
        assert!(reply_notice(ReplyTarget::Review(1), "Thanks").contains("replied to your review"));
        assert!(reply_notice(ReplyTarget::Message(1), "Hi").contains("replied to your message"));
    }

    fn support_message(text: &str, response: Option<&str>) -> SupportMessageWithAuthor {
        SupportMessageWithAuthor {
            id: 3,
            user_id: 1,
            text: text.to_string(),
            admin_response: response.map(str::to_string),
            is_read: false,
            created_at: "2025-03-01T10:00:00+00:00".to_string(),
            telegram_id: 42,
            username: None,
            first_name: Some("Oleg".to_string()),
        }
    }

    #[test]
    fn test_message_card_flags_unread() {
        let message = support_message("Where is my order?", None);
        let card = message_card(&message);
        assert!(card.starts_with("*🆕 📨 Message from Oleg*"));
        assert!(card.contains("💬 Reply: none"));
    }

    #[test]
    fn test_cards_with_longest_texts_fit_in_one_message() {
        let longest = ".".repeat(MAX_MESSAGE_LENGTH);
        let card = message_card(&support_message(&longest, Some(&longest)));
        assert!(text_len(&card) <= MESSAGE_LIMIT);
        assert!(card.contains("💬 Reply: "));

        let review = ReviewWithAuthor {
            id: 1,
            user_id: 1,
            text: longest.clone(),
            rating: Some(2),
            admin_response: Some(longest.clone()),
            created_at: "2025-03-01T10:00:00+00:00".to_string(),
            telegram_id: 42,
            username: Some("oleg_k".to_string()),
            first_name: Some("Oleg".to_string()),
        };
        assert!(text_len(&review_card(&review)) <= MESSAGE_LIMIT);
        assert!(text_len(&reply_notice(ReplyTarget::Review(1), &longest)) <= MESSAGE_LIMIT);
    }
}
