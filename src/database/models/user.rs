use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

/// Profile fields as reported by Telegram on each contact.
#[derive(Debug, Clone, Default)]
pub struct TelegramProfile {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TelegramProfile {
    pub fn from_user(user: &teloxide::types::User) -> Self {
        Self {
            telegram_id: user.id.0 as i64,
            username: user.username.clone(),
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
        }
    }
}

impl User {
    /// Inserts the user on first contact and refreshes the profile afterwards.
    pub async fn upsert(
        pool: &sqlx::SqlitePool,
        profile: &TelegramProfile,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (telegram_id, username, first_name, last_name, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(telegram_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name,
                last_name = excluded.last_name
            "#
        )
        .bind(profile.telegram_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&now)
        .execute(pool)
        .await?;

        Self::find_by_telegram_id(pool, profile.telegram_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn find_by_telegram_id(
        pool: &sqlx::SqlitePool,
        telegram_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, telegram_id, username, first_name, last_name, created_at FROM users WHERE telegram_id = ?"
        )
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &sqlx::SqlitePool,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, telegram_id, username, first_name, last_name, created_at FROM users WHERE id = ?"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Telegram ids of every registered user, oldest first.
    pub async fn all_telegram_ids(pool: &sqlx::SqlitePool) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT telegram_id FROM users ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &sqlx::SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }

    pub fn display_name(&self) -> String {
        display_name(self.first_name.as_deref(), self.username.as_deref(), self.telegram_id)
    }
}

pub(crate) fn display_name(first_name: Option<&str>, username: Option<&str>, telegram_id: i64) -> String {
    match (first_name, username) {
        (Some(name), Some(username)) => format!("{name} (@{username})"),
        (Some(name), None) => name.to_string(),
        (None, Some(username)) => format!("@{username}"),
        (None, None) => format!("user {telegram_id}"),
    }
}
