use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Kind of academic work a student can order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Coursework,
    Essay,
    Control,
    Translation,
    Presentation,
    Diploma,
    Tasks,
}

impl WorkType {
    pub const ALL: [WorkType; 7] = [
        WorkType::Coursework,
        WorkType::Essay,
        WorkType::Control,
        WorkType::Translation,
        WorkType::Presentation,
        WorkType::Diploma,
        WorkType::Tasks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkType::Coursework => "coursework",
            WorkType::Essay => "essay",
            WorkType::Control => "control",
            WorkType::Translation => "translation",
            WorkType::Presentation => "presentation",
            WorkType::Diploma => "diploma",
            WorkType::Tasks => "tasks",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkType::Coursework => "📚 Coursework",
            WorkType::Essay => "📝 Essay",
            WorkType::Control => "📐 Test paper",
            WorkType::Translation => "💡 Translation",
            WorkType::Presentation => "🎓 Presentation",
            WorkType::Diploma => "👨‍🏫 Diploma",
            WorkType::Tasks => "📋 Problem set",
        }
    }

    /// Starting price in rubles; the admin sets the final one.
    pub fn base_price(&self) -> f64 {
        match self {
            WorkType::Coursework => 1000.0,
            WorkType::Essay => 500.0,
            WorkType::Control => 700.0,
            WorkType::Translation => 150.0,
            WorkType::Presentation => 300.0,
            WorkType::Diploma => 3000.0,
            WorkType::Tasks => 400.0,
        }
    }

    pub fn price_note(&self) -> &'static str {
        match self {
            WorkType::Translation => " per 1800 characters",
            _ => "",
        }
    }

    pub fn volume_prompt(&self) -> &'static str {
        match self {
            WorkType::Coursework => "Enter the number of pages (usually 25-35):",
            WorkType::Essay => "Enter the number of pages (usually 10-15):",
            WorkType::Control => "Enter the number of problems:",
            WorkType::Translation => "Enter the number of characters or pages:",
            WorkType::Presentation => "Enter the number of slides:",
            WorkType::Diploma => "Enter the number of pages (usually 60-80):",
            WorkType::Tasks => "Enter the number of problems:",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkType::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown work type: {s}"))
    }
}

/// Order lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::InProgress,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "⏳",
            OrderStatus::Paid => "💰",
            OrderStatus::InProgress => "⚙️",
            OrderStatus::Completed => "✅",
            OrderStatus::Cancelled => "❌",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Awaiting payment",
            OrderStatus::Paid => "Paid",
            OrderStatus::InProgress => "In progress",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::InProgress)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub work_type: WorkType,
    pub subject: String,
    pub volume: String,
    pub deadline: String, // YYYY-MM-DD
    pub status: OrderStatus,
    pub price: f64,
    pub price_set_at: Option<String>,
    pub file_id: Option<String>,
    pub file_path: Option<String>,
    pub comment: Option<String>,
    pub contact_info: String,
    pub reminder_sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Everything the order wizard collects before the row is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub work_type: WorkType,
    pub subject: String,
    pub volume: String,
    pub deadline: NaiveDate,
    pub file_id: Option<String>,
    pub file_path: Option<String>,
    pub comment: Option<String>,
    pub contact_info: String,
}

/// Result of [`Order::set_price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceChange {
    Updated,
    /// The order is missing or no longer pending.
    NotPending,
    /// A receipt for the current amount is waiting for the admin.
    PaymentUnderReview,
}

/// Result of a guarded status change.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Updated(Order),
    NotFound,
    Rejected { current: OrderStatus },
}

const ORDER_COLUMNS: &str = "id, user_id, work_type, subject, volume, deadline, status, price, price_set_at, file_id, file_path, comment, contact_info, reminder_sent_at, created_at, updated_at";

impl Order {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        new_order: &NewOrder,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let deadline = new_order.deadline.format("%Y-%m-%d").to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO orders (user_id, work_type, subject, volume, deadline, status, price,
                                file_id, file_path, comment, contact_info, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(user_id)
        .bind(new_order.work_type)
        .bind(&new_order.subject)
        .bind(&new_order.volume)
        .bind(&deadline)
        .bind(new_order.work_type.base_price())
        .bind(&new_order.file_id)
        .bind(&new_order.file_path)
        .bind(&new_order.comment)
        .bind(&new_order.contact_info)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_id(pool, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        order_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user(
        pool: &sqlx::SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_status(
        pool: &sqlx::SqlitePool,
        status: OrderStatus,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? ORDER BY created_at, id"
        ))
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Sets the final price and opens the order for payment.
    ///
    /// Only pending orders can be repriced, and not while a receipt is
    /// under review. An open payment without a receipt follows the new price.
    pub async fn set_price(
        pool: &sqlx::SqlitePool,
        order_id: i64,
        price: f64,
    ) -> Result<PriceChange, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET price = ?, price_set_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
              AND NOT EXISTS (
                  SELECT 1 FROM payments
                  WHERE payments.order_id = orders.id
                    AND payments.status = 'pending'
                    AND payments.proof_file IS NOT NULL
              )
            "#
        )
        .bind(price)
        .bind(&now)
        .bind(&now)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let under_review = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM payments WHERE order_id = ? AND status = 'pending' AND proof_file IS NOT NULL"
            )
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
            tx.rollback().await?;

            return Ok(if under_review > 0 {
                PriceChange::PaymentUnderReview
            } else {
                PriceChange::NotPending
            });
        }

        sqlx::query(
            "UPDATE payments SET amount = ?, updated_at = ? WHERE order_id = ? AND status = 'pending'"
        )
        .bind(price)
        .bind(&now)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(PriceChange::Updated)
    }

    /// Moves the order to `next` if the lifecycle allows it.
    ///
    /// The update is conditional on the status read beforehand, so two
    /// concurrent admins cannot both apply a transition from the same state.
    pub async fn transition(
        pool: &sqlx::SqlitePool,
        order_id: i64,
        next: OrderStatus,
    ) -> Result<StatusChange, sqlx::Error> {
        let Some(order) = Self::find_by_id(pool, order_id).await? else {
            return Ok(StatusChange::NotFound);
        };

        if !order.status.can_transition_to(next) {
            return Ok(StatusChange::Rejected { current: order.status });
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?"
        )
        .bind(next)
        .bind(&now)
        .bind(order_id)
        .bind(order.status)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = Self::find_by_id(pool, order_id)
                .await?
                .map_or(order.status, |o| o.status);
            return Ok(StatusChange::Rejected { current });
        }

        Self::find_by_id(pool, order_id)
            .await?
            .map(StatusChange::Updated)
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn count_by_status(
        pool: &sqlx::SqlitePool,
    ) -> Result<Vec<(OrderStatus, i64)>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders GROUP BY status"
        )
        .fetch_all(pool)
        .await?;

        Ok(OrderStatus::ALL
            .into_iter()
            .map(|status| {
                let count = rows.iter().find(|(s, _)| *s == status).map_or(0, |(_, c)| *c);
                (status, count)
            })
            .collect())
    }

    /// Active orders due on or before `until` that were never reminded about.
    pub async fn due_for_reminder(
        pool: &sqlx::SqlitePool,
        until: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE status IN ('paid', 'in_progress')
               AND reminder_sent_at IS NULL
               AND deadline <= ?
             ORDER BY deadline, id"
        ))
        .bind(until.format("%Y-%m-%d").to_string())
        .fetch_all(pool)
        .await
    }

    pub async fn mark_reminded(
        pool: &sqlx::SqlitePool,
        order_id: i64,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE orders SET reminder_sent_at = ? WHERE id = ?")
            .bind(&now)
            .bind(order_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Whether the admin has confirmed the price.
    pub fn is_priced(&self) -> bool {
        self.price_set_at.is_some()
    }

    /// A pending order with a confirmed price can be paid for.
    pub fn is_payable(&self) -> bool {
        self.status == OrderStatus::Pending && self.is_priced() && self.price > 0.0
    }

    pub fn deadline_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.deadline, "%Y-%m-%d").ok()
    }

    /// Deadline in the DD.MM.YYYY form students type it in.
    pub fn deadline_display(&self) -> String {
        self.deadline_date()
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| self.deadline.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_type_round_trip_through_str() {
        for work_type in WorkType::ALL {
            assert_eq!(work_type.as_str().parse::<WorkType>().unwrap(), work_type);
        }
        assert!("thesis".parse::<WorkType>().is_err());
    }

    #[test]
    fn test_base_prices() {
        assert_eq!(WorkType::Coursework.base_price(), 1000.0);
        assert_eq!(WorkType::Diploma.base_price(), 3000.0);
        assert_eq!(WorkType::Translation.base_price(), 150.0);
        assert_eq!(WorkType::Tasks.base_price(), 400.0);
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(InProgress));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(InProgress));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Pending));

        for next in OrderStatus::ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }
}
