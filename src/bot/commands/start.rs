use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use crate::bot::commands::{price::price_list, Command};
use crate::bot::{keyboards, register_user, HandlerResult};
use crate::database::connection::DatabaseManager;
use crate::utils::markdown::{escape_markdown, MarkdownText};

pub fn welcome_text(first_name: Option<&str>) -> String {
    let greeting = match first_name {
        Some(name) => format!("Hi, {name}!"),
        None => "Hi!".to_string(),
    };

    MarkdownText::new()
        .title(&greeting)
        .line("I help students with coursework, essays, test papers, translations, presentations, diplomas and problem sets.")
        .blank()
        .line("Choose what you need:")
        .build()
}

pub async fn handle_start(bot: &Bot, msg: &Message, db: &DatabaseManager) -> HandlerResult {
    let first_name = msg.from().map(|u| u.first_name.clone());
    if let Some(user) = msg.from() {
        register_user(db, user).await?;
    }

    bot.send_message(msg.chat.id, welcome_text(first_name.as_deref()))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

/// Main menu shown by the Back buttons.
pub async fn show_main_menu(bot: &Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(chat_id, welcome_text(None))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}

pub fn help_text() -> String {
    let steps = MarkdownText::new()
        .title("🤖 How to use the bot")
        .blank()
        .title("📝 Placing an order")
        .line("1. Press \"Place an order\" or send /order")
        .line("2. Choose the type of work")
        .line("3. Describe the subject and topic")
        .line("4. Enter the volume")
        .line("5. Enter the deadline")
        .line("6. Attach the assignment file (or send -)")
        .line("7. Add a comment if needed")
        .line("8. Leave your contact details")
        .blank()
        .line("The admin reviews the order, sets the final price and sends you a payment button.")
        .build();

    format!(
        "{}\n\n{}\n\n{}",
        steps,
        price_list(),
        escape_markdown(&Command::descriptions().to_string())
    )
}

pub async fn handle_help(bot: &Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(chat_id, help_text())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::main_menu())
        .await?;
    Ok(())
}
