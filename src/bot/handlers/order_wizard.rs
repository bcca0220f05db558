//! Step-by-step order creation.
//!
//! Each step validates its input and either stays in place with a hint or
//! moves the draft to the next state. Nothing touches the database until
//! the contact step completes the draft.

use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::commands::orders::{admin_order_card, order_created_text};
use crate::bot::state::{OrderDraft, State};
use crate::bot::{keyboards, register_user, report_failure, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{Order, WorkType};
use crate::services::files::{download_to_dir, remove_quietly, Attachment};
use crate::utils::datetime::today;
use crate::utils::feedback::{notify, CommandFeedback};
use crate::utils::logging::{log_command_success, log_validation_error, Actor};
use crate::utils::validation::{
    normalize_comment, validate_contact, validate_deadline, validate_subject, validate_volume,
};

const SKIP: &str = "-";

/// Leaves the current dialogue, deleting a file the wizard already saved.
pub async fn discard_state(dialogue: &BotDialogue) -> HandlerResult {
    let uploaded = dialogue
        .get()
        .await?
        .and_then(|state| state.draft().and_then(|draft| draft.file_path.clone()));

    if let Some(path) = uploaded {
        remove_quietly(Path::new(&path)).await;
    }

    dialogue.exit().await?;
    Ok(())
}

pub async fn cancel(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    discard_state(dialogue).await?;
    bot.send_message(chat_id, "❌ Cancelled.")
        .reply_markup(keyboards::back())
        .await?;
    Ok(())
}

pub async fn start_order(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    discard_state(dialogue).await?;
    dialogue.update(State::OrderWorkType).await?;
    bot.send_message(chat_id, "📚 Choose the type of work:")
        .reply_markup(keyboards::work_types())
        .await?;
    Ok(())
}

pub async fn choose_work_type(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    work_type: WorkType,
) -> HandlerResult {
    discard_state(dialogue).await?;
    dialogue
        .update(State::OrderSubject { draft: OrderDraft::new(work_type) })
        .await?;
    bot.send_message(
        chat_id,
        format!("{}\n\n📝 Enter the subject and topic of the work:", work_type.label()),
    )
    .reply_markup(keyboards::cancel())
    .await?;
    Ok(())
}

async fn prompt(bot: &Bot, chat_id: ChatId, text: &str) -> HandlerResult {
    bot.send_message(chat_id, text)
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

async fn reject_input(
    bot: &Bot,
    msg: &Message,
    step: &str,
    error: &anyhow::Error,
    suggestion: &str,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    log_validation_error(step, msg.text().unwrap_or("<non-text>"), &error.to_string(), &actor);
    CommandFeedback::new(bot.clone(), msg.chat.id)
        .validation_error(&error.to_string(), suggestion)
        .await?;
    Ok(())
}

fn required_text(msg: &Message) -> Result<&str, anyhow::Error> {
    msg.text()
        .ok_or_else(|| anyhow::anyhow!("Please send a text message"))
}

pub async fn receive_subject(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    mut draft: OrderDraft,
) -> HandlerResult {
    match required_text(&msg).and_then(validate_subject) {
        Ok(subject) => {
            let volume_prompt = draft.work_type.volume_prompt();
            draft.subject = Some(subject);
            dialogue.update(State::OrderVolume { draft }).await?;
            prompt(&bot, msg.chat.id, &format!("📊 {volume_prompt}")).await
        }
        Err(e) => reject_input(&bot, &msg, "subject", &e, "Describe the subject and topic in 3 to 500 characters.").await,
    }
}

pub async fn receive_volume(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    mut draft: OrderDraft,
) -> HandlerResult {
    match required_text(&msg).and_then(validate_volume) {
        Ok(volume) => {
            draft.volume = Some(volume);
            dialogue.update(State::OrderDeadline { draft }).await?;
            prompt(&bot, msg.chat.id, "⏰ Enter the deadline in DD.MM.YYYY format:").await
        }
        Err(e) => reject_input(&bot, &msg, "volume", &e, "Send a number, for example 25.").await,
    }
}

pub async fn receive_deadline(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    mut draft: OrderDraft,
) -> HandlerResult {
    match required_text(&msg).and_then(|text| validate_deadline(text, today())) {
        Ok(deadline) => {
            draft.deadline = Some(deadline);
            dialogue.update(State::OrderFile { draft }).await?;
            prompt(
                &bot,
                msg.chat.id,
                "📎 Attach the assignment as a PDF, DOC or DOCX file, or send a photo.\nSend - to skip this step.",
            )
            .await
        }
        Err(e) => {
            reject_input(&bot, &msg, "deadline", &e, "Use DD.MM.YYYY, for example 25.12.2025, within the next year.").await
        }
    }
}

pub async fn receive_file(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    draft: OrderDraft,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    match store_order_file(&bot, &msg, &dialogue, draft, &config).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "order_file", &actor, e).await,
    }
}

async fn store_order_file(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    mut draft: OrderDraft,
    config: &Config,
) -> HandlerResult {
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    if msg.text().map(str::trim) != Some(SKIP) {
        let Some(attachment) = Attachment::from_message(msg) else {
            let error = anyhow::anyhow!("This is not a file or a photo");
            return reject_input(bot, msg, "file", &error, "Send a PDF, DOC or DOCX file, a photo, or - to skip.").await;
        };
        if let Err(e) = attachment.ensure_order_format() {
            return reject_input(bot, msg, "file", &e, "Send a PDF, DOC or DOCX file, a photo, or - to skip.").await;
        }

        let name = attachment.storage_name(Local::now());
        match download_to_dir(bot, attachment.file_id(), &config.files_dir, &name).await {
            Ok(path) => {
                draft.file_id = Some(attachment.file_id().to_string());
                draft.file_path = Some(path.to_string_lossy().into_owned());
                feedback.success("File uploaded!").await?;
            }
            Err(e) => {
                tracing::error!("Failed to save order file: {:#}", e);
                feedback
                    .error("Could not save the file. Please try again or send - to skip.")
                    .await?;
                return Ok(());
            }
        }
    }

    dialogue.update(State::OrderComment { draft }).await?;
    prompt(bot, msg.chat.id, "💬 Add a comment to the order, or send - if you have none:").await
}

pub async fn receive_comment(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    mut draft: OrderDraft,
) -> HandlerResult {
    match required_text(&msg) {
        Ok(text) => {
            draft.comment = normalize_comment(text);
            dialogue.update(State::OrderContact { draft }).await?;
            prompt(
                &bot,
                msg.chat.id,
                "📞 Leave your contact details (phone, email or Telegram username):",
            )
            .await
        }
        Err(e) => reject_input(&bot, &msg, "comment", &e, "Send the comment as text, or - to skip.").await,
    }
}

pub async fn receive_contact(
    bot: Bot,
    msg: Message,
    dialogue: BotDialogue,
    draft: OrderDraft,
    db: DatabaseManager,
    config: Arc<Config>,
) -> HandlerResult {
    let actor = Actor::from_user(msg.from());
    match create_order(&bot, &msg, &dialogue, draft, &db, &config).await {
        Ok(()) => Ok(()),
        Err(e) => report_failure(&bot, msg.chat.id, "order_create", &actor, e).await,
    }
}

async fn create_order(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    draft: OrderDraft,
    db: &DatabaseManager,
    config: &Config,
) -> HandlerResult {
    let contact = match required_text(msg).and_then(validate_contact) {
        Ok(contact) => contact,
        Err(e) => {
            return reject_input(bot, msg, "contact", &e, "Send a phone number, email or Telegram username.").await;
        }
    };
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let actor = Actor::from_user(Some(from));

    let new_order = draft.finish(contact)?;
    let user = register_user(db, from).await?;
    let order = Order::create(&db.pool, user.id, &new_order).await?;
    dialogue.exit().await?;

    log_command_success(
        "order_create",
        &actor,
        Some(&format!("order_id={} type={}", order.id, order.work_type)),
    );

    bot.send_message(msg.chat.id, order_created_text(&order))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::main_menu())
        .await?;

    notify(
        bot,
        ChatId(config.admin_id),
        admin_order_card(&order, Some(&user), "🆕 New order"),
        keyboards::order_admin(&order),
        "new order",
    )
    .await;
    Ok(())
}
