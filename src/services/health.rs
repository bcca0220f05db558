use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::database::connection::DatabaseManager;
use crate::database::models::{Order, OrderStatus, SupportMessage};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub database: DatabaseHealth,
    pub backlog: Option<Backlog>,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub status: String,
    pub connection_pool_size: u32,
    pub response_time_ms: u64,
}

/// Work waiting for the admin.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backlog {
    pub pending_orders: i64,
    pub unread_messages: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub start_time: DateTime<Utc>,
}

pub struct HealthService {
    pub router: Router,
}

impl HealthService {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        let state = AppState {
            db,
            start_time: Utc::now(),
        };

        let router = Router::new()
            .route("/health", get(health_check))
            .route("/health/ready", get(readiness_check))
            .route("/health/live", get(liveness_check))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        Self { router }
    }
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let db_healthy = state.db.ping().await.is_ok();
    let response_time_ms = start.elapsed().as_millis() as u64;

    if !db_healthy {
        tracing::warn!("Health check failed: database unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let backlog = match load_backlog(&state.db).await {
        Ok(backlog) => Some(backlog),
        Err(e) => {
            tracing::warn!("Health check could not load backlog: {}", e);
            None
        }
    };

    let uptime = Utc::now()
        .signed_duration_since(state.start_time)
        .num_seconds()
        .max(0) as u64;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth {
            status: "healthy".to_string(),
            connection_pool_size: state.db.pool.size(),
            response_time_ms,
        },
        backlog,
        uptime_seconds: uptime,
    }))
}

async fn load_backlog(db: &DatabaseManager) -> Result<Backlog, sqlx::Error> {
    let pending_orders = Order::count_by_status(&db.pool)
        .await?
        .into_iter()
        .find(|(status, _)| *status == OrderStatus::Pending)
        .map_or(0, |(_, count)| count);
    let unread_messages = SupportMessage::unread_count(&db.pool).await?;

    Ok(Backlog {
        pending_orders,
        unread_messages,
    })
}

async fn readiness_check(State(state): State<AppState>) -> Result<Json<&'static str>, StatusCode> {
    match state.db.ping().await {
        Ok(_) => Ok(Json("ready")),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn liveness_check() -> Json<&'static str> {
    Json("alive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use tempfile::TempDir;

    async fn create_test_health_service() -> (HealthService, Arc<DatabaseManager>, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let db = Arc::new(
            DatabaseManager::new(&db_url)
                .await
                .expect("Failed to create test database"),
        );
        db.run_migrations().await.expect("Failed to run migrations");

        (HealthService::new(db.clone()), db, temp_dir)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let health_response: HealthResponse = response.json();
        assert_eq!(health_response.status, "healthy");
        assert_eq!(health_response.database.status, "healthy");
        assert_eq!(health_response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            health_response.backlog,
            Some(Backlog { pending_orders: 0, unread_messages: 0 })
        );
    }

    #[tokio::test]
    async fn test_health_reports_backlog() {
        use crate::database::models::{NewOrder, TelegramProfile, User, WorkType};

        let (health_service, db, _temp_dir) = create_test_health_service().await;
        let user = User::upsert(&db.pool, &TelegramProfile { telegram_id: 7, ..Default::default() })
            .await
            .unwrap();
        let new_order = NewOrder {
            work_type: WorkType::Essay,
            subject: "History".to_string(),
            volume: "10".to_string(),
            deadline: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            file_id: None,
            file_path: None,
            comment: None,
            contact_info: "@student".to_string(),
        };
        Order::create(&db.pool, user.id, &new_order).await.unwrap();
        SupportMessage::create(&db.pool, user.id, "hello").await.unwrap();

        let server = TestServer::new(health_service.router).expect("Failed to create test server");
        let health_response: HealthResponse = server.get("/health").await.json();
        assert_eq!(
            health_response.backlog,
            Some(Backlog { pending_orders: 1, unread_messages: 1 })
        );
    }

    #[tokio::test]
    async fn test_readiness_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/ready").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let ready_response: String = response.json();
        assert_eq!(ready_response, "ready");
    }

    #[tokio::test]
    async fn test_liveness_endpoint() {
        let (health_service, _db, _temp_dir) = create_test_health_service().await;
        let server = TestServer::new(health_service.router).expect("Failed to create test server");

        let response = server.get("/health/live").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let alive_response: String = response.json();
        assert_eq!(alive_response, "alive");
    }
}
