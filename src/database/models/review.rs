use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::user::display_name;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub rating: Option<i64>,
    pub admin_response: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub rating: Option<i64>,
    pub admin_response: Option<String>,
    pub created_at: String,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl ReviewWithAuthor {
    pub fn author(&self) -> String {
        display_name(self.first_name.as_deref(), self.username.as_deref(), self.telegram_id)
    }

    /// First name only, as shown to other students.
    pub fn public_author(&self) -> String {
        self.first_name.clone().unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewSummary {
    pub count: i64,
    pub average_rating: Option<f64>,
}

impl Review {
    pub async fn create(
        pool: &sqlx::SqlitePool,
        user_id: i64,
        text: &str,
        rating: Option<i64>,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO reviews (user_id, text, rating, created_at, updated_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(user_id)
        .bind(text)
        .bind(rating)
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
        review_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            "SELECT id, user_id, text, rating, admin_response, created_at, updated_at FROM reviews WHERE id = ?"
        )
        .bind(review_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn recent_with_authors(
        pool: &sqlx::SqlitePool,
        limit: i64,
    ) -> Result<Vec<ReviewWithAuthor>, sqlx::Error> {
        sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
            SELECT r.id, r.user_id, r.text, r.rating, r.admin_response, r.created_at,
                   u.telegram_id, u.username, u.first_name
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT ?
            "#
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn respond(
        pool: &sqlx::SqlitePool,
        review_id: i64,
        response: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE reviews SET admin_response = ?, updated_at = ? WHERE id = ?"
        )
        .bind(response)
        .bind(&now)
        .bind(review_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn summary(pool: &sqlx::SqlitePool) -> Result<ReviewSummary, sqlx::Error> {
        let (count, average_rating) = sqlx::query_as::<_, (i64, Option<f64>)>(
            "SELECT COUNT(*), AVG(rating) FROM reviews"
        )
        .fetch_one(pool)
        .await?;

        Ok(ReviewSummary { count, average_rating })
    }
}

/// Renders a 1..=5 rating as stars.
pub fn rating_stars(rating: i64) -> String {
    "⭐".repeat(rating.clamp(0, 5) as usize)
}
