use teloxide::prelude::*;

use crate::bot::state::State;
use crate::bot::{keyboards, BotDialogue, HandlerResult};
use crate::database::{connection::DatabaseManager, models::User};
use crate::services::broadcast::{fan_out, BroadcastReport, CHUNK_SIZE, SEND_DELAY};
use crate::utils::feedback::{CommandFeedback, ProgressTracker};
use crate::utils::logging::{log_system_event, log_validation_error, Actor};
use crate::utils::validation::validate_text;

/// `/broadcast <text>` sends right away; a bare `/broadcast` asks for the text.
pub async fn handle_broadcast(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    actor: &Actor,
    text: &str,
) -> HandlerResult {
    if text.trim().is_empty() {
        return prompt_broadcast(bot, chat_id, dialogue).await;
    }
    run_broadcast(bot, chat_id, dialogue, db, actor, text).await
}

pub async fn prompt_broadcast(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.update(State::AdminBroadcast).await?;
    bot.send_message(chat_id, "📢 Enter the message to send to every user:")
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

/// Failed recipients named in the report; the rest are only counted.
const LISTED_FAILURES: usize = 50;

pub fn report_text(report: &BroadcastReport) -> String {
    let mut text = format!(
        "Broadcast finished\n📤 Sent: {}\n❌ Failed: {}",
        report.sent, report.failed
    );

    if !report.failed_ids.is_empty() {
        let listed: Vec<String> = report
            .failed_ids
            .iter()
            .take(LISTED_FAILURES)
            .map(i64::to_string)
            .collect();
        text.push_str(&format!("\nNot delivered to: {}", listed.join(", ")));
        if report.failed_ids.len() > LISTED_FAILURES {
            text.push_str(&format!(" and {} more", report.failed_ids.len() - LISTED_FAILURES));
        }
    }
    text
}

/// Sends `text` to every registered user and reports the counts to the admin.
pub async fn run_broadcast(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    actor: &Actor,
    text: &str,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), chat_id);

    let text = match validate_text(text, "Broadcast message") {
        Ok(text) => text,
        Err(e) => {
            log_validation_error("broadcast", text, &e.to_string(), actor);
            feedback
                .validation_error(&e.to_string(), "Send the broadcast text as a message.")
                .await?;
            return Ok(());
        }
    };
    dialogue.exit().await?;

    let recipients = User::all_telegram_ids(&db.pool).await?;
    if recipients.is_empty() {
        feedback.info("There are no registered users yet.").await?;
        return Ok(());
    }

    log_system_event(
        "broadcast_started",
        Some(&format!("{} recipient(s), by {}", recipients.len(), actor.telegram_id)),
    );

    let mut progress = ProgressTracker::new(feedback.clone(), recipients.len());
    progress.start("Sending broadcast").await?;

    let mut report = BroadcastReport::default();
    for chunk in recipients.chunks(CHUNK_SIZE) {
        let chunk_report = fan_out(chunk, SEND_DELAY, |recipient| {
            let request = bot.send_message(ChatId(recipient), text.clone());
            async move { request.await.map(|_| ()) }
        })
        .await;
        report.merge(chunk_report);

        if let Err(e) = progress.advance(report.total(), "Sending broadcast").await {
            tracing::debug!("Broadcast progress update skipped: {}", e);
        }
    }

    progress.complete(&report_text(&report)).await?;
    bot.send_message(chat_id, "What next?")
        .reply_markup(keyboards::admin_panel())
        .await?;

    log_system_event(
        "broadcast_finished",
        Some(&format!("sent={} failed={}", report.sent, report.failed)),
    );
    Ok(())
}
