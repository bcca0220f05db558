//! Telegram MarkdownV2 helpers.
//!
//! Every character with a special meaning in MarkdownV2 has to be escaped,
//! otherwise Telegram rejects the whole message. Cards and lists are built
//! with [`MarkdownText`], which escapes all user data on the way in.
//!
//! Telegram also rejects messages over [`MESSAGE_LIMIT`] UTF-16 code units.
//! Lengths here are measured on the escaped text, which is never shorter
//! than what Telegram counts after parsing.

const SPECIAL_CHARS: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Longest message Telegram accepts, in UTF-16 code units.
pub const MESSAGE_LIMIT: usize = 4096;

const ELLIPSIS: char = '…';

fn needs_escape(c: char) -> bool {
    c == '\\' || SPECIAL_CHARS.contains(&c)
}

/// Length of `text` the way Telegram counts it.
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Escapes markdown special characters for MarkdownV2 parsing mode.
///
/// # Example
/// ```
/// use academic_orders_bot::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("Order #12 (paid)!"), "Order \\#12 \\(paid\\)\\!");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if needs_escape(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escapes `text`, cutting it short with `…` so the result stays within
/// `budget` UTF-16 code units.
pub fn escape_markdown_clipped(text: &str, budget: usize) -> String {
    let escaped = escape_markdown(text);
    if text_len(&escaped) <= budget {
        return escaped;
    }

    let limit = budget.saturating_sub(ELLIPSIS.len_utf16());
    let mut clipped = String::with_capacity(limit);
    let mut used = 0;
    for c in text.chars() {
        let escape = needs_escape(c);
        let cost = c.len_utf16() + usize::from(escape);
        if used + cost > limit {
            break;
        }
        if escape {
            clipped.push('\\');
        }
        clipped.push(c);
        used += cost;
    }
    clipped.push(ELLIPSIS);
    clipped
}

/// Line-oriented MarkdownV2 message builder.
#[derive(Debug, Default, Clone)]
pub struct MarkdownText {
    buf: String,
}

impl MarkdownText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bold heading line.
    pub fn title(mut self, text: &str) -> Self {
        self.buf.push('*');
        self.buf.push_str(&escape_markdown(text));
        self.buf.push_str("*\n");
        self
    }

    /// Plain line.
    pub fn line(mut self, text: &str) -> Self {
        self.buf.push_str(&escape_markdown(text));
        self.buf.push('\n');
        self
    }

    /// `label: value` line with a bold label.
    pub fn field(mut self, label: &str, value: &str) -> Self {
        self.buf.push('*');
        self.buf.push_str(&escape_markdown(label));
        self.buf.push_str(":* ");
        self.buf.push_str(&escape_markdown(value));
        self.buf.push('\n');
        self
    }

    /// Plain line cut to `budget` once escaped.
    pub fn clipped_line(mut self, text: &str, budget: usize) -> Self {
        self.buf.push_str(&escape_markdown_clipped(text, budget));
        self.buf.push('\n');
        self
    }

    /// Field whose value is cut to `budget` once escaped.
    pub fn clipped_field(mut self, label: &str, value: &str, budget: usize) -> Self {
        self.buf.push('*');
        self.buf.push_str(&escape_markdown(label));
        self.buf.push_str(":* ");
        self.buf.push_str(&escape_markdown_clipped(value, budget));
        self.buf.push('\n');
        self
    }

    pub fn italic(mut self, text: &str) -> Self {
        self.buf.push('_');
        self.buf.push_str(&escape_markdown(text));
        self.buf.push_str("_\n");
        self
    }

    pub fn blank(mut self) -> Self {
        self.buf.push('\n');
        self
    }

    /// Appends a block built separately.
    pub fn append(mut self, block: MarkdownText) -> Self {
        self.buf.push_str(&block.buf);
        self
    }

    /// Current length in UTF-16 code units.
    pub fn len(&self) -> usize {
        text_len(&self.buf)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> String {
        self.buf.trim_end_matches('\n').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_basic_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("_italic_"), "\\_italic\\_");
        assert_eq!(escape_markdown("`code`"), "\\`code\\`");
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape_markdown("C:\\docs"), "C:\\\\docs");
    }

    #[test]
    fn test_escape_empty_and_plain_text() {
        assert_eq!(escape_markdown(""), "");
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("Привет 123"), "Привет 123");
    }

    #[test]
    fn test_escape_order_card_text() {
        let input = "Deadline: 01.02.2025 - price 1500.5 (base)!";
        let expected = "Deadline: 01\\.02\\.2025 \\- price 1500\\.5 \\(base\\)\\!";
        assert_eq!(escape_markdown(input), expected);
    }

    #[test]
    fn test_builder_escapes_every_part() {
        let text = MarkdownText::new()
            .title("Order #7")
            .field("Price", "1000.0 ₽")
            .line("Thanks!")
            .italic("price depends on the deadline")
            .build();

        assert_eq!(
            text,
            "*Order \\#7*\n*Price:* 1000\\.0 ₽\nThanks\\!\n_price depends on the deadline_"
        );
    }

    #[test]
    fn test_clipped_escape_stays_within_budget() {
        assert_eq!(escape_markdown_clipped("short.", 100), "short\\.");

        let dots = ".".repeat(4000);
        let clipped = escape_markdown_clipped(&dots, 1000);
        assert!(text_len(&clipped) <= 1000);
        assert!(clipped.ends_with("\\.…"));

        // Never splits an escape sequence
        let clipped = escape_markdown_clipped("ab.cd", 4);
        assert_eq!(clipped, "ab…");
    }

    #[test]
    fn test_text_len_counts_utf16_units() {
        assert_eq!(text_len("abc"), 3);
        assert_eq!(text_len("₽"), 1);
        assert_eq!(text_len("📝"), 2);
        assert_eq!(MarkdownText::new().line("📝 a").len(), 5);
    }

    #[test]
    fn test_clipped_field_and_append() {
        let block = MarkdownText::new().clipped_field("Comment", "very long comment", 6);
        let text = MarkdownText::new().title("Order").append(block).build();
        assert_eq!(text, "*Order*\n*Comment:* very …");
    }

    #[test]
    fn test_builder_blank_lines_and_trailing_newline() {
        let text = MarkdownText::new().line("a").blank().line("b").build();
        assert_eq!(text, "a\n\nb");
        assert!(MarkdownText::new().is_empty());
    }
}
