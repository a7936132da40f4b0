//! Upload acceptability rules.
//!
//! Rules are checked in order and the first failure wins:
//! 1. The extension after the final `.` must be `pptx`, `docx` or `xlsx`
//!    (case-insensitive).
//! 2. The size must not exceed [`MAX_UPLOAD_SIZE`].

use thiserror::Error;

/// Extensions accepted for upload, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pptx", "docx", "xlsx"];

/// Maximum upload size in bytes (50 MiB). Equal sizes are accepted.
pub const MAX_UPLOAD_SIZE: u64 = 50 * 1024 * 1024;

/// Value for a file picker's `accept` filter.
pub const ACCEPT_ATTRIBUTE: &str = ".pptx,.docx,.xlsx";

/// Why a candidate file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Missing or unsupported extension.
    #[error("Only PPTX, DOCX, and XLSX files are allowed")]
    UnsupportedExtension,

    /// Larger than [`MAX_UPLOAD_SIZE`].
    #[error("File size must be less than 50MB")]
    TooLarge {
        /// Size of the rejected file.
        size: u64,
    },
}

/// Lowercased text after the final `.`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

/// Check a candidate file's metadata against the upload rules.
pub fn validate_file(name: &str, size: u64) -> Result<(), ValidationError> {
    let allowed = extension_of(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);
    if !allowed {
        return Err(ValidationError::UnsupportedExtension);
    }

    if size > MAX_UPLOAD_SIZE {
        return Err(ValidationError::TooLarge { size });
    }

    Ok(())
}

/// Upper-cased extension tags for display ("PPTX", "DOCX", "XLSX").
pub fn allowed_extension_badges() -> Vec<String> {
    ALLOWED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_each_allowed_extension() {
        for name in ["deck.pptx", "letter.docx", "budget.xlsx"] {
            assert_eq!(validate_file(name, 1024), Ok(()), "{name}");
        }
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(validate_file("Quarterly.XLSX", 10), Ok(()));
        assert_eq!(validate_file("Mixed.DocX", 10), Ok(()));
    }

    #[test]
    fn test_only_final_suffix_counts() {
        assert_eq!(validate_file("archive.docx.zip", 10), Err(ValidationError::UnsupportedExtension));
        assert_eq!(validate_file("notes.txt.pptx", 10), Ok(()));
    }

    #[test]
    fn test_missing_suffix_rejected() {
        assert_eq!(validate_file("docx", 10), Err(ValidationError::UnsupportedExtension));
        assert_eq!(validate_file("report.", 10), Err(ValidationError::UnsupportedExtension));
        assert_eq!(validate_file("", 0), Err(ValidationError::UnsupportedExtension));
    }

    #[test]
    fn test_unsupported_extension_wins_over_size() {
        for size in [0, 1, MAX_UPLOAD_SIZE, MAX_UPLOAD_SIZE + 1, u64::MAX] {
            assert_eq!(
                validate_file("image.png", size),
                Err(ValidationError::UnsupportedExtension)
            );
        }
    }

    #[test]
    fn test_size_boundary() {
        assert_eq!(MAX_UPLOAD_SIZE, 52_428_800);
        assert_eq!(validate_file("big.pptx", MAX_UPLOAD_SIZE), Ok(()));
        assert_eq!(
            validate_file("big.pptx", MAX_UPLOAD_SIZE + 1),
            Err(ValidationError::TooLarge { size: MAX_UPLOAD_SIZE + 1 })
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::UnsupportedExtension.to_string(),
            "Only PPTX, DOCX, and XLSX files are allowed"
        );
        assert_eq!(
            ValidationError::TooLarge { size: 1 }.to_string(),
            "File size must be less than 50MB"
        );
    }

    #[test]
    fn test_badges() {
        assert_eq!(allowed_extension_badges(), vec!["PPTX", "DOCX", "XLSX"]);
    }
}
