use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::bot::callback_data::{AdminAction, CallbackAction, MenuAction};
use crate::database::models::{Order, OrderStatus, WorkType};

fn button(text: &str, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.to_string(), action.encode())
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📝 Place an order", CallbackAction::Menu(MenuAction::NewOrder))],
        vec![button("💰 Prices", CallbackAction::Menu(MenuAction::Price))],
        vec![button("📦 My orders", CallbackAction::Menu(MenuAction::Orders))],
        vec![button("💬 Support", CallbackAction::Menu(MenuAction::Support))],
        vec![button("⭐ Reviews", CallbackAction::Menu(MenuAction::Reviews))],
    ])
}

pub fn back() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("◀️ Back", CallbackAction::Menu(MenuAction::Main))]])
}

pub fn cancel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("❌ Cancel", CallbackAction::Cancel)]])
}

/// Work types two per row, then a cancel row.
pub fn work_types() -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = WorkType::ALL
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|w| button(w.label(), CallbackAction::WorkType(*w)))
                .collect()
        })
        .collect();
    rows.push(vec![button("❌ Cancel", CallbackAction::Cancel)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn reviews_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✍️ Leave a review", CallbackAction::LeaveReview)],
        vec![button("◀️ Back", CallbackAction::Menu(MenuAction::Main))],
    ])
}

pub fn ratings() -> InlineKeyboardMarkup {
    let stars = (1..=5)
        .map(|n| button(&format!("{n}⭐"), CallbackAction::Rate(Some(n))))
        .collect();
    InlineKeyboardMarkup::new(vec![
        stars,
        vec![button("Skip rating", CallbackAction::Rate(None))],
        vec![button("❌ Cancel", CallbackAction::Cancel)],
    ])
}

pub fn pay(order_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("💳 Pay", CallbackAction::Pay(order_id))]])
}

/// One Pay button per payable order, then Back.
pub fn orders_list(payable_order_ids: &[i64]) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = payable_order_ids
        .iter()
        .map(|id| vec![button(&format!("💳 Pay for order #{id}"), CallbackAction::Pay(*id))])
        .collect();
    rows.push(vec![button("◀️ Back", CallbackAction::Menu(MenuAction::Main))]);
    InlineKeyboardMarkup::new(rows)
}

pub fn admin_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📥 New orders", CallbackAction::Admin(AdminAction::NewOrders))],
        vec![button("📊 Statistics", CallbackAction::Admin(AdminAction::Stats))],
        vec![button("📢 Broadcast", CallbackAction::Admin(AdminAction::Broadcast))],
        vec![button("⭐ Reviews", CallbackAction::Admin(AdminAction::Reviews))],
        vec![button("📨 Messages", CallbackAction::Admin(AdminAction::Messages))],
    ])
}

pub fn back_to_admin() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("◀️ Admin panel", CallbackAction::Admin(AdminAction::Panel))]])
}

/// Management buttons valid for the order's current status.
pub fn order_admin(order: &Order) -> Option<InlineKeyboardMarkup> {
    let id = order.id;
    let rows = match order.status {
        OrderStatus::Pending => vec![vec![
            button("✅ Accept", CallbackAction::Admin(AdminAction::Accept(id))),
            button("❌ Reject", CallbackAction::Admin(AdminAction::Reject(id))),
        ]],
        OrderStatus::Paid => vec![vec![
            button("⚙️ Start work", CallbackAction::Admin(AdminAction::StartWork(id))),
            button("❌ Cancel", CallbackAction::Admin(AdminAction::Reject(id))),
        ]],
        OrderStatus::InProgress => vec![vec![button(
            "🏁 Mark completed",
            CallbackAction::Admin(AdminAction::Complete(id)),
        )]],
        OrderStatus::Completed | OrderStatus::Cancelled => return None,
    };
    Some(InlineKeyboardMarkup::new(rows))
}

pub fn payment_review(payment_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Confirm payment", CallbackAction::Admin(AdminAction::ConfirmPayment(payment_id))),
        button("❌ Reject", CallbackAction::Admin(AdminAction::RejectPayment(payment_id))),
    ]])
}

pub fn reply_review(review_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "💬 Reply",
        CallbackAction::Admin(AdminAction::ReplyReview(review_id)),
    )]])
}

pub fn reply_message(message_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button(
        "💬 Reply",
        CallbackAction::Admin(AdminAction::ReplyMessage(message_id)),
    )]])
}
