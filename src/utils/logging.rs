use teloxide::types::User;
use tracing::{debug, error, info, warn};

/// Who triggered an update, in the shape every log line uses.
#[derive(Debug, Clone)]
pub struct Actor {
    pub telegram_id: i64,
    pub username: String,
}

impl Actor {
    pub fn from_user(user: Option<&User>) -> Self {
        match user {
            Some(u) => Self {
                telegram_id: u.id.0 as i64,
                username: u.username.clone().unwrap_or_else(|| "unknown".to_string()),
            },
            None => Self {
                telegram_id: 0,
                username: "unknown".to_string(),
            },
        }
    }
}

pub fn log_command_start(command: &str, actor: &Actor, details: Option<&str>) {
    match details {
        Some(d) => info!(
            "CMD_START: {} by {}({}) - {}",
            command, actor.username, actor.telegram_id, d
        ),
        None => info!("CMD_START: {} by {}({})", command, actor.username, actor.telegram_id),
    }
}

pub fn log_command_success(command: &str, actor: &Actor, details: Option<&str>) {
    match details {
        Some(d) => info!(
            "CMD_SUCCESS: {} by {}({}) - {}",
            command, actor.username, actor.telegram_id, d
        ),
        None => info!("CMD_SUCCESS: {} by {}({})", command, actor.username, actor.telegram_id),
    }
}

pub fn log_command_error(command: &str, actor: &Actor, error: &str) {
    error!(
        "CMD_ERROR: {} by {}({}) - {}",
        command, actor.username, actor.telegram_id, error
    );
}

pub fn log_validation_error(step: &str, value: &str, error: &str, actor: &Actor) {
    warn!(
        "VALIDATION_ERROR: {} value '{}' invalid: {} - user {}({})",
        step, value, error, actor.username, actor.telegram_id
    );
}

pub fn log_access_denied(command: &str, actor: &Actor) {
    warn!(
        "ACCESS_DENIED: {} attempted by {}({})",
        command, actor.username, actor.telegram_id
    );
}

pub fn log_database_error(operation: &str, table: &str, error: &str) {
    error!("DB_ERROR: {} on {} failed: {}", operation, table, error);
}

pub fn log_database_operation(operation: &str, table: &str, details: &str) {
    debug!("DB_OP: {} on {} - {}", operation, table, details);
}

pub fn log_notification_failure(recipient: i64, purpose: &str, error: &str) {
    warn!("NOTIFY_FAILED: {} to {} - {}", purpose, recipient, error);
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
