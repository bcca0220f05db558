use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use academic_orders_bot::bot::commands::stats::AdminStats;
use academic_orders_bot::database::{connection::DatabaseManager, models::*};
use academic_orders_bot::services::broadcast::fan_out;
use academic_orders_bot::services::deadline::orders_needing_alert;
use academic_orders_bot::services::health::HealthService;
use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

async fn customer(db: &DatabaseManager, telegram_id: i64) -> Result<User> {
    let profile = TelegramProfile {
        telegram_id,
        username: Some(format!("student{telegram_id}")),
        first_name: Some("Student".to_string()),
        last_name: None,
    };
    Ok(User::upsert(&db.pool, &profile).await?)
}

async fn order_for(db: &DatabaseManager, user: &User, deadline: NaiveDate) -> Result<Order> {
    let new_order = NewOrder {
        work_type: WorkType::Presentation,
        subject: "Biology, cell structure".to_string(),
        volume: "12".to_string(),
        deadline,
        file_id: None,
        file_path: None,
        comment: None,
        contact_info: "+7 900 000 00 00".to_string(),
    };
    Ok(Order::create(&db.pool, user.id, &new_order).await?)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_admin_stats_collect() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let anna = customer(&db, 1).await?;
    customer(&db, 2).await?;

    let paid = order_for(&db, &anna, date(2025, 4, 1)).await?;
    order_for(&db, &anna, date(2025, 4, 2)).await?;
    Order::set_price(&db.pool, paid.id, 900.0).await?;
    let paid = Order::find_by_id(&db.pool, paid.id).await?.unwrap();
    let payment = Payment::start_for_order(&db.pool, &paid).await?;
    Payment::confirm(&db.pool, payment.id).await?;

    SupportMessage::create(&db.pool, anna.id, "Hello").await?;
    Review::create(&db.pool, anna.id, "Quick and neat", Some(5)).await?;

    let stats = AdminStats::collect(&db.pool).await?;
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.count_for(OrderStatus::Pending), 1);
    assert_eq!(stats.count_for(OrderStatus::Paid), 1);
    assert_eq!(stats.count_for(OrderStatus::Completed), 0);
    assert_eq!(stats.revenue, 900.0);
    assert_eq!(stats.unread_messages, 1);
    assert_eq!(stats.reviews.count, 1);

    let text = stats.render();
    assert!(text.contains("Users: 2"));
    assert!(text.contains("Revenue: 900 ₽"));

    Ok(())
}

#[tokio::test]
async fn test_deadline_alert_selection() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let anna = customer(&db, 1).await?;
    let today = date(2025, 3, 10);

    let in_two_days = order_for(&db, &anna, date(2025, 3, 12)).await?;
    let in_three_days = order_for(&db, &anna, date(2025, 3, 13)).await?;
    let overdue = order_for(&db, &anna, date(2025, 3, 8)).await?;
    for order in [&in_two_days, &in_three_days, &overdue] {
        Order::transition(&db.pool, order.id, OrderStatus::Paid).await?;
    }
    Order::transition(&db.pool, overdue.id, OrderStatus::InProgress).await?;

    let due: Vec<i64> = orders_needing_alert(&db.pool, today)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(due, vec![overdue.id, in_two_days.id]);

    Ok(())
}

#[tokio::test]
async fn test_broadcast_fan_out_counts_failures() {
    let recipients = [11, 12, 13, 14];
    let attempts = Arc::new(AtomicUsize::new(0));

    let report = fan_out(&recipients, Duration::ZERO, |recipient| {
        let attempts = attempts.clone();
        async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            if recipient % 2 == 0 {
                Err("bot was blocked by the user")
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failed_ids, vec![12, 14]);
}

#[tokio::test]
async fn test_health_endpoints_through_router() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let service = HealthService::new(Arc::new(db));

    for path in ["/health", "/health/ready", "/health/live"] {
        let response = service
            .router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }

    let missing = service
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty())?)
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    Ok(())
}
