use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/orders.db";
const DEFAULT_PAYMENT_CARD: &str = "2202 2050 0031 5959";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_id: i64,
    pub payment_token: Option<String>,
    pub database_url: String,
    pub http_port: u16,
    pub files_dir: PathBuf,
    pub payment_proofs_dir: PathBuf,
    pub payment_card: String,
    pub support_contacts: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        if token.trim().is_empty() {
            return Err(anyhow!("TELEGRAM_BOT_TOKEN must be set"));
        }

        let admin_id = env::var("ADMIN_ID")
            .map_err(|_| anyhow!("ADMIN_ID must be set"))?;
        let admin_id: i64 = admin_id.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid ADMIN_ID"))?;
        if admin_id <= 0 {
            return Err(anyhow!("Invalid ADMIN_ID"));
        }

        let database_url = non_empty_var("DATABASE_URL")
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let port_str = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "3000".to_string());
        let http_port = port_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid HTTP_PORT"))?;

        Ok(Config {
            telegram_bot_token: token,
            admin_id,
            payment_token: non_empty_var("PAYMENT_TOKEN"),
            database_url,
            http_port,
            files_dir: non_empty_var("FILES_DIR")
                .map_or_else(|| PathBuf::from("./files"), PathBuf::from),
            payment_proofs_dir: non_empty_var("PAYMENT_PROOFS_DIR")
                .map_or_else(|| PathBuf::from("./payment_proofs"), PathBuf::from),
            payment_card: non_empty_var("PAYMENT_CARD")
                .unwrap_or_else(|| DEFAULT_PAYMENT_CARD.to_string()),
            support_contacts: non_empty_var("SUPPORT_CONTACTS"),
        })
    }

    /// Only the database location, for tools that never talk to Telegram.
    pub fn database_url_from_env() -> String {
        non_empty_var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    pub fn is_admin(&self, telegram_id: i64) -> bool {
        telegram_id == self.admin_id
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
