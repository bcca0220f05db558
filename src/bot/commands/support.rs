use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::state::State;
use crate::bot::{keyboards, register_user, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::SupportMessage;
use crate::utils::feedback::{notify, CommandFeedback};
use crate::utils::logging::{log_command_success, log_validation_error, Actor};
use crate::utils::markdown::MarkdownText;
use crate::utils::validation::validate_text;

pub fn support_prompt(contacts: Option<&str>) -> String {
    let text = MarkdownText::new()
        .title("📞 Support")
        .line("Write your question and we will answer within 15-60 minutes.");

    match contacts {
        Some(contacts) => text.line(&format!("Urgent questions: {contacts}")).build(),
        None => text.build(),
    }
}

pub async fn handle_support(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    config: &Config,
) -> HandlerResult {
    dialogue.update(State::SupportMessage).await?;
    bot.send_message(chat_id, support_prompt(config.support_contacts.as_deref()))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

const NOTICE_TEXT_BUDGET: usize = 3500;

fn admin_notice(author: &str, text: &str) -> String {
    MarkdownText::new()
        .title(&format!("💬 New message from {author}"))
        .blank()
        .clipped_line(text, NOTICE_TEXT_BUDGET)
        .build()
}

/// Stores a support message and forwards it to the admin.
pub async fn submit_support_message(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    config: &Config,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let actor = Actor::from_user(Some(from));
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let text = match validate_text(msg.text().unwrap_or_default(), "Message") {
        Ok(text) => text,
        Err(e) => {
            log_validation_error("support_message", msg.text().unwrap_or_default(), &e.to_string(), &actor);
            feedback
                .validation_error(&e.to_string(), "Send your question as a text message.")
                .await?;
            return Ok(());
        }
    };

    let user = register_user(db, from).await?;
    let stored = SupportMessage::create(&db.pool, user.id, &text).await?;
    dialogue.exit().await?;

    let delivered = notify(
        bot,
        ChatId(config.admin_id),
        admin_notice(&user.display_name(), &text),
        Some(keyboards::reply_message(stored.id)),
        "support message",
    )
    .await;

    if delivered {
        feedback.success("Your message has been sent to the admin.").await?;
    } else {
        feedback
            .warning("Your message was saved, the admin will see it in the inbox.")
            .await?;
    }

    log_command_success("support_message", &actor, Some(&format!("message_id={}", stored.id)));
    Ok(())
}
