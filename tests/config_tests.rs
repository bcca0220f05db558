use academic_orders_bot::config::Config;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

// Config tests share process-wide environment variables
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

const ALL_VARS: [&str; 9] = [
    "TELEGRAM_BOT_TOKEN",
    "ADMIN_ID",
    "PAYMENT_TOKEN",
    "DATABASE_URL",
    "HTTP_PORT",
    "FILES_DIR",
    "PAYMENT_PROOFS_DIR",
    "PAYMENT_CARD",
    "SUPPORT_CONTACTS",
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("ADMIN_ID", "424242");
    env::set_var("PAYMENT_TOKEN", "provider_token");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("FILES_DIR", "/tmp/order_files");
    env::set_var("PAYMENT_PROOFS_DIR", "/tmp/proofs");
    env::set_var("PAYMENT_CARD", "1111 2222 3333 4444");
    env::set_var("SUPPORT_CONTACTS", "@helpdesk");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.admin_id, 424242);
    assert_eq!(config.payment_token.as_deref(), Some("provider_token"));
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.files_dir, PathBuf::from("/tmp/order_files"));
    assert_eq!(config.payment_proofs_dir, PathBuf::from("/tmp/proofs"));
    assert_eq!(config.payment_card, "1111 2222 3333 4444");
    assert_eq!(config.support_contacts.as_deref(), Some("@helpdesk"));
    assert!(config.is_admin(424242));
    assert!(!config.is_admin(1));

    clear_env();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");
    env::set_var("ADMIN_ID", "7");
    // Blank optional values count as unset
    env::set_var("PAYMENT_TOKEN", "  ");

    let config = Config::from_env().unwrap();

    assert_eq!(config.database_url, "sqlite:./data/orders.db");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.payment_token, None);
    assert_eq!(config.files_dir, PathBuf::from("./files"));
    assert_eq!(config.payment_proofs_dir, PathBuf::from("./payment_proofs"));
    assert_eq!(config.payment_card, "2202 2050 0031 5959");
    assert_eq!(config.support_contacts, None);

    clear_env();
}

#[test]
fn test_config_missing_required_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("ADMIN_ID", "7");
    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("TELEGRAM_BOT_TOKEN"));

    env::set_var("TELEGRAM_BOT_TOKEN", "   ");
    assert!(Config::from_env().is_err());

    clear_env();
}

#[test]
fn test_config_requires_valid_admin_id() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    let missing = Config::from_env();
    assert!(missing.unwrap_err().to_string().contains("ADMIN_ID"));

    for invalid in ["abc", "0", "-5", ""] {
        env::set_var("ADMIN_ID", invalid);
        assert!(Config::from_env().is_err(), "accepted ADMIN_ID={invalid:?}");
    }

    clear_env();
}

#[test]
fn test_config_invalid_port() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("ADMIN_ID", "7");
    env::set_var("HTTP_PORT", "not_a_port");

    let result = Config::from_env();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("HTTP_PORT"));

    clear_env();
}

#[test]
fn test_database_url_from_env() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    assert_eq!(Config::database_url_from_env(), "sqlite:./data/orders.db");
    env::set_var("DATABASE_URL", "sqlite:/var/lib/bot.db");
    assert_eq!(Config::database_url_from_env(), "sqlite:/var/lib/bot.db");

    clear_env();
}
