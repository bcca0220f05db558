use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::display_name;

/// A support message sent by a student to the admin.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SupportMessage {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub admin_response: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Support message joined with its author, for the admin inbox.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SupportMessageWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub admin_response: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl SupportMessageWithAuthor {
    pub fn author(&self) -> String {
        display_name(self.first_name.as_deref(), self.username.as_deref(), self.telegram_id)
    }
}

impl SupportMessage {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        text: &str,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO messages (user_id, text, is_read, created_at, updated_at) VALUES (?, ?, 0, ?, ?)"
        )
        .bind(user_id)
        .bind(text)
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
        message_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SupportMessage>(
            "SELECT id, user_id, text, admin_response, is_read, created_at, updated_at FROM messages WHERE id = ?"
        )
        .bind(message_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn recent_with_authors(
        pool: &sqlx::SqlitePool,
        limit: i64,
    ) -> Result<Vec<SupportMessageWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, SupportMessageWithAuthor>(
            r#"
            SELECT m.id, m.user_id, m.text, m.admin_response, m.is_read, m.created_at,
                   u.telegram_id, u.username, u.first_name
            FROM messages m
            JOIN users u ON u.id = m.user_id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?
            "#
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn mark_read(
        pool: &sqlx::SqlitePool,
        message_ids: &[i64],
    ) -> Result<u64, sqlx::Error> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = message_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query = format!(
            "UPDATE messages SET is_read = 1 WHERE is_read = 0 AND id IN ({placeholders})"
        );

        let mut query_builder = sqlx::query(&query);
        for id in message_ids {
            query_builder = query_builder.bind(id);
        }

        Ok(query_builder.execute(pool).await?.rows_affected())
    }

    /// Stores the admin reply; a replied message counts as read.
    pub async fn respond(
        pool: &sqlx::SqlitePool,
        message_id: i64,
        response: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE messages SET admin_response = ?, is_read = 1, updated_at = ? WHERE id = ?"
        )
        .bind(response)
        .bind(&now)
        .bind(message_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE is_read = 0")
            .fetch_one(pool)
            .await
    }
}
