//! Error taxonomy for ingestion and persistence.
//!
//! Playback never produces errors: every out-of-range transport request is
//! clamped. Only document ingestion and the persistence layer can fail.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Remediation text attached to [`ReaderError::DocumentEmpty`].
pub const IMAGE_ONLY_GUIDANCE: &str = "This PDF is likely a scanned image (no text layer). \
Run it through an OCR tool to add a text layer and upload the converted file, \
or use an EPUB version if one is available.";

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("Unsupported file format: {name}. Please upload .epub or .pdf files.")]
    UnsupportedFormat { name: String },

    #[error("Failed to parse {format} file: {message}")]
    ParseFailure { format: &'static str, message: String },

    #[error("Could not extract text from this document. {guidance}")]
    DocumentEmpty { guidance: &'static str },

    #[error("Failed to save {what}. Storage quota may be exceeded.")]
    StorageQuotaExceeded { what: String },

    #[error("Storage error on key `{key}`: {message}")]
    Storage { key: String, message: String },

    #[error("Book not found: {0}")]
    NotFound(String),

    #[error("operation cancelled at stage={0}")]
    Cancelled(&'static str),
}

impl ReaderError {
    pub fn parse_failure(format: &'static str, err: impl std::fmt::Display) -> Self {
        ReaderError::ParseFailure {
            format,
            message: err.to_string(),
        }
    }

    pub fn document_empty() -> Self {
        ReaderError::DocumentEmpty {
            guidance: IMAGE_ONLY_GUIDANCE,
        }
    }

    pub fn storage(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ReaderError::Storage {
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Ingestion errors are terminal for the upload attempt; storage errors
    /// leave the active reading session running.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            ReaderError::StorageQuotaExceeded { .. } | ReaderError::Storage { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_empty_mentions_scan_guidance() {
        let message = ReaderError::document_empty().to_string();
        assert!(message.contains("scanned image"));
    }

    #[test]
    fn parse_failure_keeps_original_message() {
        let err = ReaderError::parse_failure("EPUB", "missing container.xml");
        assert_eq!(
            err.to_string(),
            "Failed to parse EPUB file: missing container.xml"
        );
        assert!(!err.is_persistence());
    }
}
