use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};

pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const ALLOWED_DOCUMENT_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

pub fn validate_subject(subject: &str) -> Result<String> {
    let subject = subject.trim();

    if subject.chars().count() < 3 {
        return Err(anyhow!("Description is too short, please add more detail"));
    }

    if subject.chars().count() > 500 {
        return Err(anyhow!("Description cannot be longer than 500 characters"));
    }

    Ok(subject.to_string())
}

/// Volume is a positive number of pages, slides, problems or characters.
pub fn validate_volume(volume: &str) -> Result<String> {
    let volume = volume.trim();

    if volume.is_empty() {
        return Err(anyhow!("Volume cannot be empty"));
    }

    if volume.len() > 10 {
        return Err(anyhow!("Volume is too long"));
    }

    let dots = volume.chars().filter(|c| *c == '.').count();
    let digits_only = volume.chars().all(|c| c.is_ascii_digit() || c == '.');
    if !digits_only || dots > 1 || volume.starts_with('.') || volume.ends_with('.') {
        return Err(anyhow!("Please enter a numeric value"));
    }

    match volume.parse::<f64>() {
        Ok(value) if value > 0.0 => Ok(volume.to_string()),
        _ => Err(anyhow!("Volume must be greater than zero")),
    }
}

/// Parses a `DD.MM.YYYY` deadline that must fall within the next year.
pub fn validate_deadline(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let deadline = NaiveDate::parse_from_str(input.trim(), "%d.%m.%Y")
        .map_err(|_| anyhow!("Invalid date format, use DD.MM.YYYY"))?;

    if deadline < today {
        return Err(anyhow!("The date cannot be in the past"));
    }

    if deadline > today + Duration::days(365) {
        return Err(anyhow!("The deadline is too far away, pick a date within a year"));
    }

    Ok(deadline)
}

pub fn validate_contact(contact: &str) -> Result<String> {
    let contact = contact.trim();

    if contact.chars().count() < 3 {
        return Err(anyhow!("Contact information is too short"));
    }

    if contact.chars().count() > 255 {
        return Err(anyhow!("Contact information cannot be longer than 255 characters"));
    }

    Ok(contact.to_string())
}

/// `-` means "no comment".
pub fn normalize_comment(comment: &str) -> Option<String> {
    let comment = comment.trim();
    if comment.is_empty() || comment == "-" {
        None
    } else {
        Some(comment.to_string())
    }
}

/// Accepts `1500`, `1500.50` and `1500,50`.
pub fn parse_price(input: &str) -> Result<f64> {
    let normalized = input.trim().replace(',', ".");
    let price: f64 = normalized
        .parse()
        .map_err(|_| anyhow!("Please enter a valid amount"))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(anyhow!("The price must be greater than zero"));
    }

    if price > 10_000_000.0 {
        return Err(anyhow!("The price is unrealistically high"));
    }

    Ok((price * 100.0).round() / 100.0)
}

pub fn validate_rating(rating: i64) -> Result<i64> {
    if (1..=5).contains(&rating) {
        Ok(rating)
    } else {
        Err(anyhow!("Rating must be between 1 and 5"))
    }
}

pub fn validate_document_name(file_name: &str) -> Result<String> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .ok_or_else(|| anyhow!("Only PDF, DOC and DOCX files are supported"))?;

    if ALLOWED_DOCUMENT_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(anyhow!("Only PDF, DOC and DOCX files are supported"))
    }
}

/// Free text sent to support, as a review, as a reply or as a broadcast.
pub fn validate_text(text: &str, what: &str) -> Result<String> {
    let text = text.trim();

    if text.is_empty() {
        return Err(anyhow!("{what} cannot be empty"));
    }

    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(anyhow!("{what} cannot be longer than {MAX_MESSAGE_LENGTH} characters"));
    }

    Ok(text.to_string())
}
