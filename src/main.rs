//! # Academic Orders Bot Main Entry Point
//!
//! Initializes logging, loads configuration, prepares the database, starts
//! the deadline watch and the health endpoint, and runs the Telegram bot.

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academic_orders_bot::bot::handlers::BotHandler;
use academic_orders_bot::config::Config;
use academic_orders_bot::database::connection::DatabaseManager;
use academic_orders_bot::services::deadline::DeadlineWatch;
use academic_orders_bot::services::health::HealthService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academic_orders_bot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!("Starting Academic Orders Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded - Database: {}, HTTP Port: {}, Admin: {}",
        config.database_url, config.http_port, config.admin_id
    );
    if config.payment_token.is_some() {
        info!("Payment provider token configured");
    } else {
        info!("No payment provider token, card transfers only");
    }

    info!("Initializing database connection...");
    let db_manager = DatabaseManager::new(&config.database_url).await?;
    info!("Running database migrations...");
    db_manager.run_migrations().await?;
    let db_arc = Arc::new(db_manager);
    info!("Database initialized successfully");

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = BotHandler::new(db_arc.as_ref().clone(), config.clone());

    let mut deadline_watch = DeadlineWatch::new(bot.clone(), db_arc.clone(), config.admin_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create deadline watch: {}", e))?;
    if let Err(e) = deadline_watch.start().await {
        tracing::error!("Failed to start deadline watch: {}", e);
    }

    let health_service = HealthService::new(db_arc.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to port {}: {}", config.http_port, e))?;
    info!("Health check server starting on port {}", config.http_port);

    let bot_task = tokio::spawn(async move {
        Dispatcher::builder(bot, handler.schema())
            .dependencies(handler.dependencies())
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    });

    let health_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, health_service.router).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    tokio::select! {
        result = bot_task => {
            if let Err(e) = result {
                tracing::error!("Bot task error: {}", e);
            }
        }
        result = health_task => {
            if let Err(e) = result {
                tracing::error!("Health task error: {}", e);
            }
        }
    }

    if let Err(e) = deadline_watch.stop().await {
        tracing::warn!("Error stopping deadline watch: {}", e);
    }

    info!("Application stopped");
    Ok(())
}
