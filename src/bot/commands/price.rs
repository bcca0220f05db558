use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::bot::keyboards;
use crate::database::models::WorkType;
use crate::utils::markdown::MarkdownText;

/// Starting prices for every work type.
pub fn price_list() -> String {
    WorkType::ALL
        .iter()
        .fold(MarkdownText::new().title("💵 Starting prices").blank(), |text, work_type| {
            text.line(&format!(
                "{}: from {} ₽{}",
                work_type.label(),
                format_rubles(work_type.base_price()),
                work_type.price_note()
            ))
        })
        .blank()
        .italic("The final price depends on the deadline, complexity and volume.")
        .build()
}

/// `1500` for whole amounts, `1500.50` otherwise.
pub fn format_rubles(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}

pub async fn handle_price(bot: &Bot, chat_id: ChatId) -> ResponseResult<()> {
    bot.send_message(chat_id, price_list())
        .parse_mode(ParseMode::MarkdownV2)
        .reply_markup(keyboards::back())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_list_mentions_every_work_type() {
        let text = price_list();
        for work_type in WorkType::ALL {
            assert!(text.contains(work_type.label()), "missing {}", work_type.label());
        }
        assert!(text.contains("from 3000 ₽"));
        assert!(text.contains("from 150 ₽ per 1800 characters"));
    }

    #[test]
    fn test_format_rubles() {
        assert_eq!(format_rubles(1500.0), "1500");
        assert_eq!(format_rubles(1500.5), "1500.50");
    }
}
