use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use teloxide::prelude::*;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::bot::keyboards;
use crate::database::{connection::DatabaseManager, models::*};
use crate::utils::datetime::{days_until, today};
use crate::utils::feedback::notify;
use crate::utils::logging::log_database_error;
use crate::utils::markdown::MarkdownText;

/// Orders due within this many days trigger an admin alert.
pub const ALERT_WINDOW_DAYS: i64 = 2;

pub struct DeadlineWatch {
    bot: Bot,
    db: Arc<DatabaseManager>,
    admin_id: i64,
    scheduler: JobScheduler,
}

impl DeadlineWatch {
    pub async fn new(
        bot: Bot,
        db: Arc<DatabaseManager>,
        admin_id: i64,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            bot,
            db,
            admin_id,
            scheduler,
        })
    }

    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // 9 AM and 6 PM UTC
        let bot = self.bot.clone();
        let db = self.db.clone();
        let admin_id = self.admin_id;

        let job = Job::new_async("0 0 9,18 * * *", move |_uuid, _l| {
            let bot = bot.clone();
            let db = db.clone();
            Box::pin(async move {
                match check_deadlines(&bot, &db, admin_id, today()).await {
                    Ok(0) => tracing::debug!("Deadline check: nothing due"),
                    Ok(sent) => tracing::info!("Deadline check: {} alert(s) sent", sent),
                    Err(e) => tracing::error!("Deadline check failed: {}", e),
                }
            })
        })?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        tracing::info!("Deadline watch started - checking twice daily at 9 AM and 6 PM UTC");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.scheduler.shutdown().await?;
        Ok(())
    }

    pub async fn check_now(&self) -> Result<usize, sqlx::Error> {
        check_deadlines(&self.bot, &self.db, self.admin_id, today()).await
    }
}

/// Active orders that should get an alert as of `today`.
pub async fn orders_needing_alert(
    pool: &sqlx::SqlitePool,
    today: NaiveDate,
) -> Result<Vec<Order>, sqlx::Error> {
    Order::due_for_reminder(pool, today + Duration::days(ALERT_WINDOW_DAYS)).await
}

/// Sends one alert per due order. An order is only marked as reminded
/// once the admin actually received the alert.
async fn check_deadlines(
    bot: &Bot,
    db: &DatabaseManager,
    admin_id: i64,
    today: NaiveDate,
) -> Result<usize, sqlx::Error> {
    let due = orders_needing_alert(&db.pool, today).await.map_err(|e| {
        log_database_error("select_due", "orders", &e.to_string());
        e
    })?;

    let mut sent = 0;
    for order in due {
        let text = deadline_alert(&order, today);
        let delivered = notify(
            bot,
            ChatId(admin_id),
            text,
            keyboards::order_admin(&order),
            "deadline alert",
        )
        .await;

        if delivered {
            Order::mark_reminded(&db.pool, order.id).await?;
            sent += 1;
        }
    }

    Ok(sent)
}

pub fn deadline_alert(order: &Order, today: NaiveDate) -> String {
    let when = match order.deadline_date().map(|d| days_until(d, today)) {
        Some(days) if days < 0 => format!("overdue by {} day(s)", -days),
        Some(0) => "due today".to_string(),
        Some(1) => "due tomorrow".to_string(),
        Some(days) => format!("due in {days} days"),
        None => "deadline unknown".to_string(),
    };

    MarkdownText::new()
        .title(&format!("⏰ Order #{} is {}", order.id, when))
        .blank()
        .field("Type", order.work_type.label())
        .field("Subject", &order.subject)
        .field("Deadline", &order.deadline_display())
        .field("Status", &format!("{} {}", order.status.emoji(), order.status.label()))
        .build()
}
