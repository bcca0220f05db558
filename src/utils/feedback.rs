use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use crate::utils::logging::log_notification_failure;
use crate::utils::markdown::escape_markdown;

/// Feedback types for different command outcomes
#[derive(Debug, Clone, Copy)]
pub enum FeedbackType {
    Success,
    Warning,
    Error,
    Info,
    Processing,
    Denied,
}

impl FeedbackType {
    pub fn emoji(&self) -> &'static str {
        match self {
            FeedbackType::Success => "✅",
            FeedbackType::Warning => "⚠️",
            FeedbackType::Error => "❌",
            FeedbackType::Info => "ℹ️",
            FeedbackType::Processing => "⏳",
            FeedbackType::Denied => "⛔",
        }
    }

    pub fn format(&self, message: &str) -> String {
        format!("{} {}", self.emoji(), escape_markdown(message))
    }
}

/// Short status replies sent to the chat a command came from.
#[derive(Clone)]
pub struct CommandFeedback {
    bot: Bot,
    chat_id: ChatId,
}

impl CommandFeedback {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub async fn send(&self, feedback_type: FeedbackType, message: &str) -> ResponseResult<Message> {
        self.bot
            .send_message(self.chat_id, feedback_type.format(message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn update_message(
        &self,
        message_id: MessageId,
        feedback_type: FeedbackType,
        message: &str,
    ) -> ResponseResult<Message> {
        self.bot
            .edit_message_text(self.chat_id, message_id, feedback_type.format(message))
            .parse_mode(ParseMode::MarkdownV2)
            .await
    }

    pub async fn success(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Success, message).await
    }

    pub async fn error(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Error, message).await
    }

    pub async fn warning(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Warning, message).await
    }

    pub async fn info(&self, message: &str) -> ResponseResult<Message> {
        self.send(FeedbackType::Info, message).await
    }

    pub async fn denied(&self) -> ResponseResult<Message> {
        self.send(FeedbackType::Denied, "You don't have access to the admin panel.").await
    }

    /// Validation error with a hint on what to send instead.
    pub async fn validation_error(&self, error: &str, suggestion: &str) -> ResponseResult<Message> {
        let message = format!("{error}\n\n💡 {suggestion}");
        self.send(FeedbackType::Error, &message).await
    }

    pub async fn generic_failure(&self) -> ResponseResult<Message> {
        self.error("Something went wrong. Please try again later.").await
    }
}

/// Sends a MarkdownV2 message to a user or the admin.
///
/// Delivery failures (blocked bot, deleted account) are logged and reported
/// as `false`; they never abort the handler that triggered them.
pub async fn notify(
    bot: &Bot,
    chat_id: ChatId,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
    purpose: &str,
) -> bool {
    let mut request = bot.send_message(chat_id, text).parse_mode(ParseMode::MarkdownV2);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }

    match request.await {
        Ok(_) => true,
        Err(e) => {
            log_notification_failure(chat_id.0, purpose, &e.to_string());
            false
        }
    }
}

/// Live progress message for long fan-out operations.
pub struct ProgressTracker {
    feedback: CommandFeedback,
    message_id: Option<MessageId>,
    total: usize,
}

impl ProgressTracker {
    pub fn new(feedback: CommandFeedback, total: usize) -> Self {
        Self {
            feedback,
            message_id: None,
            total,
        }
    }

    pub async fn start(&mut self, initial_message: &str) -> ResponseResult<()> {
        let progress_message = format!("{} (0/{})", initial_message, self.total);
        let message = self.feedback.send(FeedbackType::Processing, &progress_message).await?;
        self.message_id = Some(message.id);
        Ok(())
    }

    /// Refreshes the progress line; the final count is left to [`complete`](Self::complete).
    pub async fn advance(&mut self, done: usize, step_message: &str) -> ResponseResult<()> {
        if let Some(message_id) = self.message_id {
            if done < self.total {
                let progress_message = format!("{} ({}/{})", step_message, done, self.total);
                self.feedback
                    .update_message(message_id, FeedbackType::Processing, &progress_message)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn complete(&mut self, completion_message: &str) -> ResponseResult<()> {
        match self.message_id {
            Some(message_id) => {
                self.feedback
                    .update_message(message_id, FeedbackType::Success, completion_message)
                    .await?;
            }
            None => {
                self.feedback.success(completion_message).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_type_emojis() {
        assert_eq!(FeedbackType::Success.emoji(), "✅");
        assert_eq!(FeedbackType::Warning.emoji(), "⚠️");
        assert_eq!(FeedbackType::Error.emoji(), "❌");
        assert_eq!(FeedbackType::Info.emoji(), "ℹ️");
        assert_eq!(FeedbackType::Processing.emoji(), "⏳");
        assert_eq!(FeedbackType::Denied.emoji(), "⛔");
    }

    #[test]
    fn test_feedback_format_escapes_message() {
        assert_eq!(
            FeedbackType::Error.format("Order #5 not found."),
            "❌ Order \\#5 not found\\."
        );
    }
}
