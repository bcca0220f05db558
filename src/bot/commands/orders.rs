use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::commands::price::format_rubles;
use crate::bot::{keyboards, HandlerResult};
use crate::database::connection::DatabaseManager;
use crate::database::models::{Order, User};
use crate::utils::datetime::format_timestamp;
use crate::utils::markdown::{MarkdownText, MESSAGE_LIMIT};

const COMMENT_BUDGET: usize = 1500;

/// Orders the admin has priced and the student can still pay for.
pub fn payable_order_ids(orders: &[Order]) -> Vec<i64> {
    orders.iter().filter(|o| o.is_payable()).map(|o| o.id).collect()
}

fn price_line(order: &Order) -> String {
    if order.is_priced() {
        format!("{} ₽", format_rubles(order.price))
    } else {
        format!("from {} ₽, awaiting confirmation", format_rubles(order.price))
    }
}

pub fn user_order_list(orders: &[Order]) -> String {
    if orders.is_empty() {
        return MarkdownText::new()
            .line("You have no orders yet.")
            .line("Press \"Place an order\" or send /order to create one.")
            .build();
    }

    let mut text = MarkdownText::new().title("📦 Your orders").blank();
    for (shown, order) in orders.iter().enumerate() {
        let entry = MarkdownText::new()
            .line(&format!(
                "{} Order #{} · {}",
                order.status.emoji(),
                order.id,
                order.work_type.label()
            ))
            .line(&format!("Status: {}", order.status.label()))
            .line(&format!("Price: {}", price_line(order)))
            .line(&format!("Deadline: {}", order.deadline_display()))
            .blank();

        // Leave room for the "more" line
        if text.len() + entry.len() + 64 > MESSAGE_LIMIT {
            return text
                .line(&format!("…and {} older order(s)", orders.len() - shown))
                .build();
        }
        text = text.append(entry);
    }
    text.build()
}

/// Full order card for the admin.
pub fn admin_order_card(order: &Order, customer: Option<&User>, heading: &str) -> String {
    let customer = customer.map_or_else(|| format!("user #{}", order.user_id), User::display_name);

    MarkdownText::new()
        .title(&format!("{} #{}", heading, order.id))
        .blank()
        .field("Customer", &customer)
        .field("Type", order.work_type.label())
        .field("Subject", &order.subject)
        .field("Volume", &order.volume)
        .field("Deadline", &order.deadline_display())
        .field("Price", &price_line(order))
        .field("Status", &format!("{} {}", order.status.emoji(), order.status.label()))
        .field("Contacts", &order.contact_info)
        .clipped_field("Comment", order.comment.as_deref().unwrap_or("none"), COMMENT_BUDGET)
        .field("File", order.file_path.as_deref().unwrap_or("none"))
        .field("Created", &format_timestamp(&order.created_at))
        .build()
}

/// Confirmation sent to the student once the wizard is done.
pub fn order_created_text(order: &Order) -> String {
    MarkdownText::new()
        .title(&format!("✅ Order #{} has been created!", order.id))
        .blank()
        .field("Type", order.work_type.label())
        .field("Subject", &order.subject)
        .field("Volume", &order.volume)
        .field("Deadline", &order.deadline_display())
        .blank()
        .line("The admin will review your order and set the exact price.")
        .build()
}

pub async fn handle_orders(
    bot: &Bot,
    chat_id: ChatId,
    db: &DatabaseManager,
    telegram_id: i64,
) -> HandlerResult {
    let orders = match User::find_by_telegram_id(&db.pool, telegram_id).await? {
        Some(user) => Order::find_by_user(&db.pool, user.id).await?,
        None => Vec::new(),
    };

    bot.send_message(chat_id, user_order_list(&orders))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::orders_list(&payable_order_ids(&orders)))
        .await?;
    Ok(())
}
