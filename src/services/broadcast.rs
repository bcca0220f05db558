//! Sequential fan-out of one message to many recipients.
//!
//! Telegram throttles bots that send to many chats at once, so recipients
//! are served one by one with a pause between sends. A failed delivery is
//! counted and skipped, it never stops the run.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::utils::logging::log_notification_failure;

/// Pause between two broadcast sends.
pub const SEND_DELAY: Duration = Duration::from_millis(50);

/// Recipients handled between two progress updates.
pub const CHUNK_SIZE: usize = 25;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    pub failed_ids: Vec<i64>,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }

    pub fn merge(&mut self, other: BroadcastReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.failed_ids.extend(other.failed_ids);
    }
}

/// Calls `send` for every recipient in order, sleeping `delay` after each one.
pub async fn fan_out<F, Fut, E>(recipients: &[i64], delay: Duration, mut send: F) -> BroadcastReport
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut report = BroadcastReport::default();

    for &recipient in recipients {
        match send(recipient).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                log_notification_failure(recipient, "broadcast", &e.to_string());
                report.failed += 1;
                report.failed_ids.push(recipient);
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    report
}
