use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::commands::price::format_rubles;
use crate::bot::{keyboards, HandlerResult};
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::markdown::MarkdownText;

/// Business overview shown in the admin panel.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_orders: i64,
    pub orders_by_status: Vec<(OrderStatus, i64)>,
    pub revenue: f64,
    pub unread_messages: i64,
    pub reviews: ReviewSummary,
}

impl AdminStats {
    pub async fn collect(pool: &sqlx::SqlitePool) -> Result<Self, sqlx::Error> {
        let orders_by_status = Order::count_by_status(pool).await?;

        Ok(Self {
            total_users: User::count(pool).await?,
            total_orders: orders_by_status.iter().map(|(_, count)| count).sum(),
            orders_by_status,
            revenue: Payment::total_revenue(pool).await?,
            unread_messages: SupportMessage::unread_count(pool).await?,
            reviews: Review::summary(pool).await?,
        })
    }

    pub fn count_for(&self, status: OrderStatus) -> i64 {
        self.orders_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, count)| *count)
    }

    pub fn render(&self) -> String {
        let mut text = MarkdownText::new()
            .title("📊 Statistics")
            .blank()
            .line(&format!("👥 Users: {}", self.total_users))
            .line(&format!("📦 Orders: {}", self.total_orders))
            .line(&format!("💰 Revenue: {} ₽", format_rubles(self.revenue)))
            .line(&format!("📨 Unread messages: {}", self.unread_messages));

        text = match self.reviews.average_rating {
            Some(average) => text.line(&format!(
                "⭐ Reviews: {} (average {:.1})",
                self.reviews.count, average
            )),
            None => text.line(&format!("⭐ Reviews: {}", self.reviews.count)),
        };

        self.orders_by_status
            .iter()
            .fold(text.blank().title("📈 Orders by status"), |text, (status, count)| {
                text.line(&format!("{} {}: {}", status.emoji(), status.label(), count))
            })
            .build()
    }
}

pub async fn handle_stats(bot: &Bot, chat_id: ChatId, db: &DatabaseManager) -> HandlerResult {
    let stats = AdminStats::collect(&db.pool).await?;

    bot.send_message(chat_id, stats.render())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::back_to_admin())
        .await?;
    Ok(())
}
