use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::ReviewError;
use crate::api::PdfDocument;
use crate::domain::ExcuseId;

/// Keep a backend-supplied file name from escaping the target directory.
pub fn sanitize_filename(raw: &str, fallback: &ExcuseId) -> String {
    let base = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim().to_string();

    let name = if cleaned.is_empty() {
        format!("excuse-{}", fallback.0)
    } else {
        cleaned
    };

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{name}.pdf")
    }
}

/// Decode the rendered PDF and write it into `directory`.
pub async fn write_pdf(
    document: &PdfDocument,
    id: &ExcuseId,
    directory: &Path,
) -> Result<PathBuf, ReviewError> {
    let bytes = STANDARD.decode(document.pdf_base64.trim())?;
    let target = directory.join(sanitize_filename(&document.filename, id));

    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|source| ReviewError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&target, bytes)
        .await
        .map_err(|source| ReviewError::Io {
            path: target.clone(),
            source,
        })?;

    tracing::info!(excuse_id = %id, path = %target.display(), "excuse document saved");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ExcuseId {
        ExcuseId("12".to_string())
    }

    #[test]
    fn strips_directories_and_odd_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd", &id()), "passwd.pdf");
        assert_eq!(
            sanitize_filename("C:\\temp\\Excuse <12>.pdf", &id()),
            "Excuse _12_.pdf"
        );
    }

    #[test]
    fn falls_back_to_excuse_id() {
        assert_eq!(sanitize_filename("", &id()), "excuse-12.pdf");
        assert_eq!(sanitize_filename("...", &id()), "excuse-12.pdf");
    }
}
