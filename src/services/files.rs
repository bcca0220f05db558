//! Downloads of order attachments and payment proofs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Message;
use tokio::io::AsyncWriteExt;

use crate::utils::validation::validate_document_name;

/// A file the user sent, before it is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Document {
        file_id: String,
        unique_id: String,
        name: String,
    },
    Photo {
        file_id: String,
        unique_id: String,
    },
}

impl Attachment {
    /// Document or largest photo size of the message, if any.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if let Some(document) = msg.document() {
            return Some(Attachment::Document {
                file_id: document.file.id.clone(),
                unique_id: document.file.unique_id.clone(),
                name: document
                    .file_name
                    .clone()
                    .unwrap_or_else(|| "document".to_string()),
            });
        }

        msg.photo()
            .and_then(|sizes| sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)))
            .map(|photo| Attachment::Photo {
                file_id: photo.file.id.clone(),
                unique_id: photo.file.unique_id.clone(),
            })
    }

    pub fn file_id(&self) -> &str {
        match self {
            Attachment::Document { file_id, .. } | Attachment::Photo { file_id, .. } => file_id,
        }
    }

    pub fn is_photo(&self) -> bool {
        matches!(self, Attachment::Photo { .. })
    }

    /// Checks the document extension; photos are always accepted.
    pub fn ensure_order_format(&self) -> Result<()> {
        match self {
            Attachment::Document { name, .. } => validate_document_name(name).map(|_| ()),
            Attachment::Photo { .. } => Ok(()),
        }
    }

    /// Name the file is stored under.
    pub fn storage_name(&self, at: DateTime<Local>) -> String {
        match self {
            Attachment::Document { unique_id, name, .. } => build_file_name(at, unique_id, name),
            Attachment::Photo { unique_id, .. } => build_file_name(at, unique_id, "photo.jpg"),
        }
    }
}

/// `<YYYYmmdd_HHMMSS>_<unique id>_<original name>` with path separators removed.
pub fn build_file_name(at: DateTime<Local>, unique_id: &str, original: &str) -> String {
    let safe_name: String = original
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let safe_name = safe_name.trim_start_matches('.');
    let safe_name = if safe_name.is_empty() { "file" } else { safe_name };

    format!("{}_{}_{}", at.format("%Y%m%d_%H%M%S"), unique_id, safe_name)
}

/// Downloads a Telegram file into `dir`, creating the directory if needed.
///
/// A partially written file is removed when the download fails.
pub async fn download_to_dir(bot: &Bot, file_id: &str, dir: &Path, name: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let file = bot
        .get_file(file_id)
        .await
        .context("Failed to resolve Telegram file")?;

    let path = dir.join(name);
    let mut destination = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let downloaded = match bot.download_file(&file.path, &mut destination).await {
        Ok(()) => destination.flush().await.context("Failed to flush downloaded file"),
        Err(e) => Err(anyhow::Error::new(e).context("Failed to download file")),
    };
    if let Err(e) = downloaded {
        drop(destination);
        remove_quietly(&path).await;
        return Err(e);
    }

    tracing::debug!("Saved Telegram file {} to {}", file_id, path.display());
    Ok(path)
}

/// Deletes a stored file, logging instead of failing.
pub async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 10, 14, 5, 9).unwrap()
    }

    #[test]
    fn test_build_file_name() {
        assert_eq!(
            build_file_name(fixed_time(), "AgAD", "essay.docx"),
            "20250310_140509_AgAD_essay.docx"
        );
    }

    #[test]
    fn test_build_file_name_strips_path_components() {
        assert_eq!(
            build_file_name(fixed_time(), "AgAD", "../../etc/passwd"),
            "20250310_140509_AgAD__.._etc_passwd"
        );
        assert_eq!(build_file_name(fixed_time(), "AgAD", ""), "20250310_140509_AgAD_file");
    }

    #[test]
    fn test_order_format_check() {
        let pdf = Attachment::Document {
            file_id: "f".to_string(),
            unique_id: "u".to_string(),
            name: "Task.PDF".to_string(),
        };
        let exe = Attachment::Document {
            file_id: "f".to_string(),
            unique_id: "u".to_string(),
            name: "setup.exe".to_string(),
        };
        let photo = Attachment::Photo {
            file_id: "p".to_string(),
            unique_id: "u".to_string(),
        };

        assert!(pdf.ensure_order_format().is_ok());
        assert!(exe.ensure_order_format().is_err());
        assert!(photo.ensure_order_format().is_ok());
        assert_eq!(photo.storage_name(fixed_time()), "20250310_140509_u_photo.jpg");
    }

    #[tokio::test]
    async fn test_remove_quietly_ignores_missing_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("upload.pdf");
        tokio::fs::write(&path, b"data").await.unwrap();

        remove_quietly(&path).await;
        assert!(!path.exists());
        remove_quietly(&path).await;
    }
}
