use anyhow::Result;
use chrono::{Duration, NaiveDate};
use academic_orders_bot::database::{connection::DatabaseManager, models::*};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

fn profile(telegram_id: i64, username: &str) -> TelegramProfile {
    TelegramProfile {
        telegram_id,
        username: Some(username.to_string()),
        first_name: Some("Anna".to_string()),
        last_name: None,
    }
}

fn new_order(work_type: WorkType, deadline: NaiveDate) -> NewOrder {
    NewOrder {
        work_type,
        subject: "Economics, market structures".to_string(),
        volume: "30".to_string(),
        deadline,
        file_id: None,
        file_path: None,
        comment: Some("Follow the university template".to_string()),
        contact_info: "@anna".to_string(),
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_schema_has_all_tables() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let tables = db.table_names().await?;
    for table in ["messages", "orders", "payments", "reviews", "users"] {
        assert!(tables.contains(&table.to_string()), "missing table {table}");
    }
    db.ping().await?;

    Ok(())
}

#[tokio::test]
async fn test_user_upsert_is_idempotent() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    let first = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let second = User::upsert(&db.pool, &profile(1001, "anna_new")).await?;

    assert_eq!(first.id, second.id);
    assert_eq!(second.username.as_deref(), Some("anna_new"));
    assert_eq!(User::count(&db.pool).await?, 1);

    let found = User::find_by_telegram_id(&db.pool, 1001).await?.unwrap();
    assert_eq!(found.id, first.id);
    assert!(User::find_by_telegram_id(&db.pool, 9999).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_all_telegram_ids_in_registration_order() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;

    User::upsert(&db.pool, &profile(30, "c")).await?;
    User::upsert(&db.pool, &profile(10, "a")).await?;
    User::upsert(&db.pool, &profile(20, "b")).await?;

    assert_eq!(User::all_telegram_ids(&db.pool).await?, vec![30, 10, 20]);

    Ok(())
}

#[tokio::test]
async fn test_order_creation_uses_base_price() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;

    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Coursework, date(2025, 5, 20))).await?;

    assert_eq!(order.user_id, user.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.price, WorkType::Coursework.base_price());
    assert_eq!(order.deadline, "2025-05-20");
    assert_eq!(order.deadline_display(), "20.05.2025");
    assert_eq!(order.comment.as_deref(), Some("Follow the university template"));
    assert!(order.reminder_sent_at.is_none());

    let orders = Order::find_by_user(&db.pool, user.id).await?;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, order.id);

    Ok(())
}

#[tokio::test]
async fn test_set_price_only_for_pending_orders() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Essay, date(2025, 5, 20))).await?;
    assert!(!order.is_priced());
    assert!(!order.is_payable());

    assert_eq!(Order::set_price(&db.pool, order.id, 2750.5).await?, PriceChange::Updated);
    let priced = Order::find_by_id(&db.pool, order.id).await?.unwrap();
    assert_eq!(priced.price, 2750.5);
    assert!(priced.is_payable());

    Order::transition(&db.pool, order.id, OrderStatus::Paid).await?;
    assert_eq!(Order::set_price(&db.pool, order.id, 1.0).await?, PriceChange::NotPending);
    assert_eq!(Order::set_price(&db.pool, 9999, 1.0).await?, PriceChange::NotPending);

    Ok(())
}

#[tokio::test]
async fn test_repricing_follows_open_payment_until_receipt_arrives() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Coursework, date(2025, 5, 20))).await?;

    Order::set_price(&db.pool, order.id, 1000.0).await?;
    let order = Order::find_by_id(&db.pool, order.id).await?.unwrap();
    let payment = Payment::start_for_order(&db.pool, &order).await?;
    assert_eq!(payment.amount, 1000.0);

    // No receipt yet: the open payment takes the new amount
    assert_eq!(Order::set_price(&db.pool, order.id, 2500.0).await?, PriceChange::Updated);
    let payment = Payment::find_by_id(&db.pool, payment.id).await?.unwrap();
    assert_eq!(payment.amount, 2500.0);

    // Receipt under review: the price is frozen
    Payment::attach_proof(&db.pool, payment.id, "payment_proofs/receipt.jpg").await?;
    assert_eq!(
        Order::set_price(&db.pool, order.id, 3000.0).await?,
        PriceChange::PaymentUnderReview
    );
    let order = Order::find_by_id(&db.pool, order.id).await?.unwrap();
    assert_eq!(order.price, 2500.0);

    match Payment::confirm(&db.pool, payment.id).await? {
        Confirmation::Confirmed(paid) => assert_eq!(paid.status, OrderStatus::Paid),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(Payment::total_revenue(&db.pool).await?, order.price);

    Ok(())
}

#[tokio::test]
async fn test_confirm_refuses_payment_for_cancelled_order() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Coursework, date(2025, 5, 20))).await?;
    Order::set_price(&db.pool, order.id, 1000.0).await?;
    let order = Order::find_by_id(&db.pool, order.id).await?.unwrap();

    let payment = Payment::start_for_order(&db.pool, &order).await?;
    Payment::attach_proof(&db.pool, payment.id, "payment_proofs/receipt.jpg").await?;
    Order::transition(&db.pool, order.id, OrderStatus::Cancelled).await?;

    assert!(matches!(
        Payment::confirm(&db.pool, payment.id).await?,
        Confirmation::OrderNotPayable(OrderStatus::Cancelled)
    ));

    let stored = Payment::find_by_id(&db.pool, payment.id).await?.unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    let stored_order = Order::find_by_id(&db.pool, order.id).await?.unwrap();
    assert_eq!(stored_order.status, OrderStatus::Cancelled);
    assert_eq!(Payment::total_revenue(&db.pool).await?, 0.0);

    // The admin can still reject it
    assert!(Payment::set_status(&db.pool, payment.id, PaymentStatus::Failed).await?);

    Ok(())
}

#[tokio::test]
async fn test_confirm_is_applied_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Essay, date(2025, 5, 20))).await?;
    Order::set_price(&db.pool, order.id, 800.0).await?;
    let order = Order::find_by_id(&db.pool, order.id).await?.unwrap();
    let payment = Payment::start_for_order(&db.pool, &order).await?;

    assert!(matches!(Payment::confirm(&db.pool, payment.id).await?, Confirmation::Confirmed(_)));
    assert!(matches!(
        Payment::confirm(&db.pool, payment.id).await?,
        Confirmation::PaymentNotPending(PaymentStatus::Completed)
    ));
    assert!(matches!(Payment::confirm(&db.pool, 9999).await?, Confirmation::NotFound));
    assert_eq!(Payment::total_revenue(&db.pool).await?, 800.0);

    Ok(())
}

#[tokio::test]
async fn test_order_lifecycle_transitions() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Diploma, date(2025, 6, 1))).await?;

    // Work cannot start before payment
    match Order::transition(&db.pool, order.id, OrderStatus::InProgress).await? {
        StatusChange::Rejected { current } => assert_eq!(current, OrderStatus::Pending),
        other => panic!("unexpected {other:?}"),
    }

    for next in [OrderStatus::Paid, OrderStatus::InProgress, OrderStatus::Completed] {
        match Order::transition(&db.pool, order.id, next).await? {
            StatusChange::Updated(updated) => assert_eq!(updated.status, next),
            other => panic!("unexpected {other:?}"),
        }
    }

    // Completed is terminal
    assert!(matches!(
        Order::transition(&db.pool, order.id, OrderStatus::Cancelled).await?,
        StatusChange::Rejected { current: OrderStatus::Completed }
    ));
    assert!(matches!(
        Order::transition(&db.pool, 9999, OrderStatus::Paid).await?,
        StatusChange::NotFound
    ));

    Ok(())
}

#[tokio::test]
async fn test_count_by_status_includes_empty_statuses() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;

    let first = Order::create(&db.pool, user.id, &new_order(WorkType::Essay, date(2025, 5, 1))).await?;
    Order::create(&db.pool, user.id, &new_order(WorkType::Essay, date(2025, 5, 2))).await?;
    Order::transition(&db.pool, first.id, OrderStatus::Cancelled).await?;

    let counts = Order::count_by_status(&db.pool).await?;
    assert_eq!(counts.len(), OrderStatus::ALL.len());
    assert!(counts.contains(&(OrderStatus::Pending, 1)));
    assert!(counts.contains(&(OrderStatus::Cancelled, 1)));
    assert!(counts.contains(&(OrderStatus::Paid, 0)));

    Ok(())
}

#[tokio::test]
async fn test_due_for_reminder() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let today = date(2025, 3, 10);

    let soon = Order::create(&db.pool, user.id, &new_order(WorkType::Tasks, today + Duration::days(1))).await?;
    let later = Order::create(&db.pool, user.id, &new_order(WorkType::Tasks, today + Duration::days(10))).await?;
    let unpaid = Order::create(&db.pool, user.id, &new_order(WorkType::Tasks, today)).await?;
    for order in [&soon, &later] {
        Order::transition(&db.pool, order.id, OrderStatus::Paid).await?;
    }

    let due = Order::due_for_reminder(&db.pool, today + Duration::days(2)).await?;
    let ids: Vec<i64> = due.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![soon.id]);
    assert!(!ids.contains(&unpaid.id));

    Order::mark_reminded(&db.pool, soon.id).await?;
    assert!(Order::due_for_reminder(&db.pool, today + Duration::days(2)).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_payment_start_reuses_open_payment() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Control, date(2025, 5, 1))).await?;
    Order::set_price(&db.pool, order.id, 1200.0).await?;
    let order = Order::find_by_id(&db.pool, order.id).await?.unwrap();

    let payment = Payment::start_for_order(&db.pool, &order).await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 1200.0);
    assert_eq!(payment.user_id, user.id);
    assert!(payment.transaction_id.is_some());

    let again = Payment::start_for_order(&db.pool, &order).await?;
    assert_eq!(again.id, payment.id);

    // A rejected payment is reopened for a retry
    assert!(Payment::set_status(&db.pool, payment.id, PaymentStatus::Failed).await?);
    let retry = Payment::start_for_order(&db.pool, &order).await?;
    assert_eq!(retry.id, payment.id);
    assert_eq!(retry.status, PaymentStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn test_payment_status_rules_and_revenue() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;
    let order = Order::create(&db.pool, user.id, &new_order(WorkType::Translation, date(2025, 5, 1))).await?;

    let payment = Payment::start_for_order(&db.pool, &order).await?;
    Payment::attach_proof(&db.pool, payment.id, "payment_proofs/receipt.jpg").await?;
    assert_eq!(Payment::total_revenue(&db.pool).await?, 0.0);

    assert!(Payment::set_status(&db.pool, payment.id, PaymentStatus::Completed).await?);
    // A second confirmation is a no-op
    assert!(!Payment::set_status(&db.pool, payment.id, PaymentStatus::Completed).await?);
    assert!(!Payment::set_status(&db.pool, payment.id, PaymentStatus::Failed).await?);

    let stored = Payment::find_by_id(&db.pool, payment.id).await?.unwrap();
    assert_eq!(stored.status, PaymentStatus::Completed);
    assert_eq!(stored.proof_file.as_deref(), Some("payment_proofs/receipt.jpg"));
    assert_eq!(Payment::total_revenue(&db.pool).await?, order.price);

    Ok(())
}

#[tokio::test]
async fn test_support_messages_read_and_reply() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;

    let first = SupportMessage::create(&db.pool, user.id, "When will my order be ready?").await?;
    let second = SupportMessage::create(&db.pool, user.id, "Can I add a file?").await?;
    assert!(!first.is_read);
    assert_eq!(SupportMessage::unread_count(&db.pool).await?, 2);

    let recent = SupportMessage::recent_with_authors(&db.pool, 10).await?;
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second.id);
    assert_eq!(recent[0].telegram_id, 1001);

    assert_eq!(SupportMessage::mark_read(&db.pool, &[first.id]).await?, 1);
    assert_eq!(SupportMessage::mark_read(&db.pool, &[]).await?, 0);
    assert_eq!(SupportMessage::unread_count(&db.pool).await?, 1);

    assert!(SupportMessage::respond(&db.pool, second.id, "Yes, send it here").await?);
    let replied = SupportMessage::find_by_id(&db.pool, second.id).await?.unwrap();
    assert!(replied.is_read);
    assert_eq!(replied.admin_response.as_deref(), Some("Yes, send it here"));
    assert_eq!(SupportMessage::unread_count(&db.pool).await?, 0);
    assert!(!SupportMessage::respond(&db.pool, 9999, "nobody").await?);

    Ok(())
}

#[tokio::test]
async fn test_reviews_and_summary() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;

    let empty = Review::summary(&db.pool).await?;
    assert_eq!(empty.count, 0);
    assert_eq!(empty.average_rating, None);

    let good = Review::create(&db.pool, user.id, "Great work, on time", Some(5)).await?;
    Review::create(&db.pool, user.id, "Fine", Some(4)).await?;
    Review::create(&db.pool, user.id, "No stars from me", None).await?;

    let summary = Review::summary(&db.pool).await?;
    assert_eq!(summary.count, 3);
    assert_eq!(summary.average_rating, Some(4.5));

    assert!(Review::respond(&db.pool, good.id, "Thank you!").await?);
    let stored = Review::find_by_id(&db.pool, good.id).await?.unwrap();
    assert_eq!(stored.admin_response.as_deref(), Some("Thank you!"));

    let recent = Review::recent_with_authors(&db.pool, 2).await?;
    assert_eq!(recent.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_rating_out_of_range_is_rejected_by_schema() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let user = User::upsert(&db.pool, &profile(1001, "anna")).await?;

    assert!(Review::create(&db.pool, user.id, "Too good", Some(6)).await.is_err());

    Ok(())
}
