use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::state::State;
use crate::bot::{keyboards, register_user, BotDialogue, HandlerResult};
use crate::config::Config;
use crate::database::connection::DatabaseManager;
use crate::database::models::{rating_stars, Review, ReviewSummary, ReviewWithAuthor};
use crate::utils::feedback::{notify, CommandFeedback};
use crate::utils::logging::{log_command_success, log_validation_error, Actor};
use crate::utils::markdown::{MarkdownText, MESSAGE_LIMIT};
use crate::utils::validation::validate_text;

/// Reviews shown to students.
pub const PUBLIC_REVIEW_LIMIT: i64 = 5;

const PUBLIC_TEXT_BUDGET: usize = 700;
const PUBLIC_REPLY_BUDGET: usize = 300;
const NOTICE_TEXT_BUDGET: usize = 3500;

fn public_review(review: &ReviewWithAuthor) -> MarkdownText {
    let block = match review.rating {
        Some(rating) => MarkdownText::new().line(&rating_stars(rating)),
        None => MarkdownText::new(),
    };
    let block = block
        .clipped_line(&format!("\"{}\"", review.text), PUBLIC_TEXT_BUDGET)
        .italic(&format!("- {}", review.public_author()));
    let block = match &review.admin_response {
        Some(response) => block.clipped_line(&format!("💬 Reply: {response}"), PUBLIC_REPLY_BUDGET),
        None => block,
    };
    block.blank()
}

/// Latest reviews for students; reviews that would overflow one message are left out.
pub fn reviews_text(reviews: &[ReviewWithAuthor], summary: ReviewSummary) -> String {
    let footer = MarkdownText::new().line("Want to share your experience? Leave a review!");
    let mut text = MarkdownText::new().title("📢 Latest reviews");

    if let Some(average) = summary.average_rating {
        text = text.line(&format!("Average rating: {average:.1} of 5 ({} reviews)", summary.count));
    }
    text = text.blank();

    if reviews.is_empty() {
        text = text.line("No reviews yet, be the first!").blank();
    }

    for review in reviews {
        let block = public_review(review);
        if text.len() + block.len() + footer.len() > MESSAGE_LIMIT {
            break;
        }
        text = text.append(block);
    }

    text.append(footer).build()
}

pub async fn handle_reviews(bot: &Bot, chat_id: ChatId, db: &DatabaseManager) -> HandlerResult {
    let reviews = Review::recent_with_authors(&db.pool, PUBLIC_REVIEW_LIMIT).await?;
    let summary = Review::summary(&db.pool).await?;

    bot.send_message(chat_id, reviews_text(&reviews, summary))
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::reviews_menu())
        .await?;
    Ok(())
}

pub async fn start_review(bot: &Bot, chat_id: ChatId, dialogue: &BotDialogue) -> HandlerResult {
    dialogue.update(State::ReviewRating).await?;
    bot.send_message(chat_id, "⭐ How would you rate our work?")
        .reply_markup(keyboards::ratings())
        .await?;
    Ok(())
}

pub async fn choose_rating(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &BotDialogue,
    rating: Option<i64>,
) -> HandlerResult {
    dialogue.update(State::ReviewText { rating }).await?;
    bot.send_message(chat_id, "✍️ Now write your review:")
        .reply_markup(keyboards::cancel())
        .await?;
    Ok(())
}

fn admin_notice(author: &str, rating: Option<i64>, text: &str) -> String {
    let notice = MarkdownText::new().title(&format!("⭐ New review from {author}"));
    let notice = match rating {
        Some(rating) => notice.field("Rating", &format!("{rating}/5 {}", rating_stars(rating))),
        None => notice,
    };
    notice.blank().clipped_line(text, NOTICE_TEXT_BUDGET).build()
}

pub async fn submit_review(
    bot: &Bot,
    msg: &Message,
    dialogue: &BotDialogue,
    db: &DatabaseManager,
    config: &Config,
    rating: Option<i64>,
) -> HandlerResult {
    let Some(from) = msg.from() else {
        return Ok(());
    };
    let actor = Actor::from_user(Some(from));
    let feedback = CommandFeedback::new(bot.clone(), msg.chat.id);

    let text = match validate_text(msg.text().unwrap_or_default(), "Review") {
        Ok(text) => text,
        Err(e) => {
            log_validation_error("review_text", msg.text().unwrap_or_default(), &e.to_string(), &actor);
            feedback
                .validation_error(&e.to_string(), "Send your review as a text message.")
                .await?;
            return Ok(());
        }
    };

    let user = register_user(db, from).await?;
    let review = Review::create(&db.pool, user.id, &text, rating).await?;
    dialogue.exit().await?;

    notify(
        bot,
        ChatId(config.admin_id),
        admin_notice(&user.display_name(), rating, &text),
        Some(keyboards::reply_review(review.id)),
        "new review",
    )
    .await;

    bot.send_message(msg.chat.id, "🙏 Thank you! Your review has been saved.")
        .reply_markup(keyboards::main_menu())
        .await?;

    log_command_success("review", &actor, Some(&format!("review_id={}", review.id)));
    Ok(())
}
