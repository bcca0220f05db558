use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
                | (PaymentStatus::Failed, PaymentStatus::Pending)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub order_id: i64,
    pub amount: f64,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub proof_file: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Result of [`Payment::confirm`].
#[derive(Debug, Clone)]
pub enum Confirmation {
    /// Payment completed and the order marked as paid.
    Confirmed(Order),
    NotFound,
    PaymentNotPending(PaymentStatus),
    OrderNotPayable(OrderStatus),
}

pub const MANUAL_TRANSFER: &str = "card_transfer";

const PAYMENT_COLUMNS: &str = "id, user_id, order_id, amount, status, payment_method, transaction_id, proof_file, created_at, updated_at";

impl Payment {
    /// Returns the open payment for the order, creating one if needed.
    ///
    /// A pending payment is reused with its amount refreshed; a failed one
    /// goes back to pending so the student can retry.
    pub async fn start_for_order(
        pool: &sqlx::SqlitePool,
        order: &Order,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        if let Some(existing) = Self::find_latest_by_order(pool, order.id).await? {
            if matches!(existing.status, PaymentStatus::Pending | PaymentStatus::Failed) {
                sqlx::query(
                    "UPDATE payments SET status = 'pending', amount = ?, updated_at = ? WHERE id = ?"
                )
                .bind(order.price)
                .bind(&now)
                .bind(existing.id)
                .execute(pool)
                .await?;

                return Self::find_by_id(pool, existing.id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound);
            }
        }

        let transaction_id = Uuid::new_v4().to_string();
        let result = sqlx::query(
            r#"
            INSERT INTO payments (user_id, order_id, amount, status, payment_method, transaction_id, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?, ?, ?)
            "#
        )
        .bind(order.user_id)
        .bind(order.id)
        .bind(order.price)
        .bind(MANUAL_TRANSFER)
        .bind(&transaction_id)
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
        payment_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"))
            .bind(payment_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_latest_by_order(
        pool: &sqlx::SqlitePool,
        order_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ? ORDER BY id DESC LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn attach_proof(
        pool: &sqlx::SqlitePool,
        payment_id: i64,
        proof_file: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE payments SET proof_file = ?, updated_at = ? WHERE id = ?")
            .bind(proof_file)
            .bind(&now)
            .bind(payment_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Applies a status change allowed by [`PaymentStatus::can_transition_to`].
    /// Returns `false` when the payment is missing or the change is not allowed.
    pub async fn set_status(
        pool: &sqlx::SqlitePool,
        payment_id: i64,
        next: PaymentStatus,
    ) -> Result<bool, sqlx::Error> {
        let Some(payment) = Self::find_by_id(pool, payment_id).await? else {
            return Ok(false);
        };
        if !payment.status.can_transition_to(next) {
            return Ok(false);
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE payments SET status = ?, updated_at = ? WHERE id = ? AND status = ?"
        )
        .bind(next)
        .bind(&now)
        .bind(payment_id)
        .bind(payment.status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Completes a pending payment and marks its order as paid.
    ///
    /// Both rows change together or not at all: a payment is never
    /// completed for an order that can no longer become paid.
    pub async fn confirm(
        pool: &sqlx::SqlitePool,
        payment_id: i64,
    ) -> Result<Confirmation, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let payment_sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?");
        let Some(payment) = sqlx::query_as::<_, Payment>(&payment_sql)
            .bind(payment_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(Confirmation::NotFound);
        };
        if !payment.status.can_transition_to(PaymentStatus::Completed) {
            return Ok(Confirmation::PaymentNotPending(payment.status));
        }

        let Some(order_status) = sqlx::query_scalar::<_, OrderStatus>("SELECT status FROM orders WHERE id = ?")
            .bind(payment.order_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(Confirmation::NotFound);
        };
        if !order_status.can_transition_to(OrderStatus::Paid) {
            return Ok(Confirmation::OrderNotPayable(order_status));
        }

        let now = Utc::now().to_rfc3339();
        let paid = sqlx::query(
            "UPDATE payments SET status = 'completed', updated_at = ? WHERE id = ? AND status = 'pending'"
        )
        .bind(&now)
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;
        let moved = sqlx::query(
            "UPDATE orders SET status = 'paid', updated_at = ? WHERE id = ? AND status = ?"
        )
        .bind(&now)
        .bind(payment.order_id)
        .bind(order_status)
        .execute(&mut *tx)
        .await?;

        if paid.rows_affected() == 0 || moved.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(Confirmation::PaymentNotPending(payment.status));
        }
        tx.commit().await?;

        Order::find_by_id(pool, payment.order_id)
            .await?
            .map(Confirmation::Confirmed)
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Sum of all completed payments.
    pub async fn total_revenue(pool: &sqlx::SqlitePool) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            "SELECT CAST(COALESCE(SUM(amount), 0) AS REAL) FROM payments WHERE status = 'completed'"
        )
        .fetch_one(pool)
        .await
    }
}
