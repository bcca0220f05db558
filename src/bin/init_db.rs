use academic_orders_bot::config::Config;
use academic_orders_bot::database::connection::DatabaseManager;
use academic_orders_bot::database::models::{NewOrder, Order, TelegramProfile, User, WorkType};
use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Local};
use std::env;
use std::io;
use std::path::Path;

/// Telegram id used by `seed` when none is given on the command line.
const DEFAULT_SEED_TELEGRAM_ID: i64 = 5615980623;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("migrate");

    match command {
        "migrate" | "up" => run_migrations().await.map(|_| ()),
        "check" => check_database().await,
        "seed" => seed_database(args.get(2).map(|s| s.as_str())).await,
        "reset" => reset_database().await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            print_help();
            std::process::exit(1);
        }
    }
}

/// Creates the parent directory of a file-backed SQLite database.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    let db_path = db_path.trim_start_matches("//");
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            println!("📁 Creating directory: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn run_migrations() -> Result<DatabaseManager> {
    println!("🔧 Academic Orders Bot - Database Initialization");
    println!("================================================");

    let database_url = Config::database_url_from_env();
    println!("📊 Database URL: {}", mask_url(&database_url));
    ensure_sqlite_dir(&database_url)?;

    println!("🚀 Running database migrations...");
    let db_manager = DatabaseManager::new(&database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

    match db_manager.run_migrations().await {
        Ok(_) => println!("✅ Migrations completed successfully!"),
        Err(e) => {
            eprintln!("❌ Migration failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(db_manager)
}

async fn check_database() -> Result<()> {
    println!("🔍 Checking database connection and schema...");

    let database_url = Config::database_url_from_env();
    println!("📊 Database URL: {}", mask_url(&database_url));

    let db_manager = DatabaseManager::new(&database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))?;

    match db_manager.table_names().await {
        Ok(tables) if tables.is_empty() => {
            println!("⚠️  The database has no tables yet");
            println!("💡 Run 'init-db migrate' to create the schema");
        }
        Ok(tables) => {
            println!("✅ Database connection successful!");
            println!("📋 Found tables:");
            for table in tables {
                println!("  • {table}");
            }
        }
        Err(e) => {
            println!("⚠️  Database check failed: {e}");
            println!("💡 Run 'init-db migrate' to create the schema");
        }
    }

    Ok(())
}

async fn seed_database(telegram_id: Option<&str>) -> Result<()> {
    let telegram_id = match telegram_id {
        Some(raw) => raw
            .parse::<i64>()
            .with_context(|| format!("Invalid telegram id: {raw}"))?,
        None => DEFAULT_SEED_TELEGRAM_ID,
    };

    let db_manager = run_migrations().await?;

    println!("🌱 Creating test data...");
    let profile = TelegramProfile {
        telegram_id,
        username: Some("test_user".to_string()),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
    };
    let user = User::upsert(&db_manager.pool, &profile).await?;
    println!("👤 Test user #{} (telegram id {})", user.id, user.telegram_id);

    let new_order = NewOrder {
        work_type: WorkType::Coursework,
        subject: "Test Subject".to_string(),
        volume: "25".to_string(),
        deadline: Local::now().date_naive() + Duration::days(7),
        file_id: None,
        file_path: None,
        comment: None,
        contact_info: "test@example.com".to_string(),
    };
    let order = Order::create(&db_manager.pool, user.id, &new_order).await?;
    println!("📝 Test order #{} due {}", order.id, order.deadline_display());

    println!("✅ Test data created successfully!");
    Ok(())
}

async fn reset_database() -> Result<()> {
    println!("⚠️  WARNING: This will delete ALL data in the database!");
    println!("🤔 Are you sure you want to continue? (yes/no)");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    if input.trim().to_lowercase() != "yes" {
        println!("❌ Reset cancelled.");
        return Ok(());
    }

    let database_url = Config::database_url_from_env();
    let Some(db_path) = database_url.strip_prefix("sqlite:") else {
        return Err(anyhow!("Reset is only supported for SQLite databases"));
    };
    let db_path = db_path.trim_start_matches("//");
    if Path::new(db_path).exists() {
        std::fs::remove_file(db_path)?;
        println!("🗑️  Deleted database file: {db_path}");
    }

    println!("🔄 Recreating database schema...");
    run_migrations().await?;

    println!("✅ Database reset completed!");
    Ok(())
}

fn mask_url(url: &str) -> String {
    if let Some(path) = url.strip_prefix("sqlite:") {
        if let Some(filename) = Path::new(path).file_name() {
            return format!("sqlite:.../{}", filename.to_string_lossy());
        }
    }
    url.to_string()
}

fn print_help() {
    println!("🎓 Academic Orders Bot - Database Initialization");
    println!();
    println!("USAGE:");
    println!("    init-db [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    migrate, up        Run database migrations (default)");
    println!("    check              Check database connection and schema");
    println!("    seed [TG_ID]       Create a test user and a test order");
    println!("    reset              Reset database (SQLite only) - DESTRUCTIVE!");
    println!("    help               Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    DATABASE_URL   Database connection string (default: sqlite:./data/orders.db)");
    println!();
}
