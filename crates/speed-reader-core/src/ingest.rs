//! Turning an uploaded file into plain text plus section markers.

use crate::cancellation::CancellationToken;
use crate::config::AppConfig;
use crate::epub_loader::{self, EpubContent};
use crate::error::{ReaderError, Result};
use crate::pdf::{self, OxidePdf, PdfPrimitive};
use crate::sections::SectionMarker;
use crate::text_utils::count_words;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookFormat {
    Epub,
    Pdf,
}

impl BookFormat {
    /// Decide the format from the file extension alone.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("epub") => Ok(BookFormat::Epub),
            Some("pdf") => Ok(BookFormat::Pdf),
            _ => Err(ReaderError::UnsupportedFormat {
                name: path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            }),
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookFormat::Epub => write!(f, "epub"),
            BookFormat::Pdf => write!(f, "pdf"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBook {
    pub title: String,
    pub author: String,
    pub text: String,
    pub word_count: usize,
    pub format: BookFormat,
    pub section_markers: Vec<SectionMarker>,
}

/// Parse `path` as EPUB or PDF. PDFs are read through `pdf_source`, the
/// text-extraction primitive for that file.
pub fn ingest_file(
    path: &Path,
    pdf_source: Option<&mut dyn PdfPrimitive>,
    config: &AppConfig,
    cancel: Option<&CancellationToken>,
) -> Result<ParsedBook> {
    let format = BookFormat::from_path(path)?;
    let fallback_title = file_stem(path);
    let book = match format {
        BookFormat::Epub => {
            let content = epub_loader::read_epub(path)?;
            if let Some(token) = cancel {
                token.check_cancelled("epub_read")?;
            }
            book_from_epub(&content, &fallback_title)?
        }
        BookFormat::Pdf => {
            match pdf_source {
                Some(source) => book_from_pdf(source, config, cancel, &fallback_title)?,
                None => {
                    let mut document = OxidePdf::open(path)?;
                    book_from_pdf(&mut document, config, cancel, &fallback_title)?
                }
            }
        }
    };
    info!(
        title = %book.title,
        format = %book.format,
        words = book.word_count,
        sections = book.section_markers.len(),
        "Ingested book"
    );
    Ok(book)
}

pub fn book_from_epub(content: &EpubContent, fallback_title: &str) -> Result<ParsedBook> {
    let assembled = epub_loader::assemble_epub(content);
    let word_count = count_words(&assembled.text);
    if word_count == 0 {
        return Err(ReaderError::document_empty());
    }
    Ok(ParsedBook {
        title: non_blank(content.title.as_deref()).unwrap_or_else(|| fallback_title.to_string()),
        author: non_blank(content.author.as_deref()).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        text: assembled.text,
        word_count,
        format: BookFormat::Epub,
        section_markers: assembled.markers,
    })
}

pub fn book_from_pdf(
    source: &mut dyn PdfPrimitive,
    config: &AppConfig,
    cancel: Option<&CancellationToken>,
    fallback_title: &str,
) -> Result<ParsedBook> {
    let extraction = pdf::extract_body_text(source, &config.classifier, cancel)?;
    Ok(ParsedBook {
        title: non_blank(extraction.metadata.title.as_deref())
            .unwrap_or_else(|| fallback_title.to_string()),
        author: non_blank(extraction.metadata.author.as_deref())
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        text: extraction.text,
        word_count: extraction.word_count,
        format: BookFormat::Pdf,
        section_markers: Vec::new(),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled".to_string())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub_loader::EpubSpineItem;
    use crate::pdf::{FragmentDump, PdfPage, TextFragment};
    use std::path::PathBuf;

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = BookFormat::from_path(Path::new("/books/notes.txt")).unwrap_err();
        match err {
            ReaderError::UnsupportedFormat { name } => assert_eq!(name, "notes.txt"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            BookFormat::from_path(Path::new("Book.EPUB")).unwrap(),
            BookFormat::Epub
        );
    }

    #[test]
    fn unreadable_pdf_is_a_parse_failure() {
        let err = ingest_file(
            &PathBuf::from("/definitely/not/here/paper.pdf"),
            None,
            &AppConfig::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ReaderError::ParseFailure { format: "PDF", .. }));
    }

    #[test]
    fn epub_metadata_falls_back_to_stem_and_unknown() {
        let content = EpubContent {
            title: Some("   ".to_string()),
            author: None,
            spine: vec![EpubSpineItem {
                href: "ch1.xhtml".to_string(),
                html: "<p>Some readable words here.</p>".to_string(),
            }],
            toc: Vec::new(),
        };
        let book = book_from_epub(&content, "my-book").unwrap();
        assert_eq!(book.title, "my-book");
        assert_eq!(book.author, UNKNOWN_AUTHOR);
        assert_eq!(book.word_count, 4);
        assert_eq!(book.format, BookFormat::Epub);
    }

    #[test]
    fn epub_without_text_is_document_empty() {
        let content = EpubContent::default();
        let err = book_from_epub(&content, "empty").unwrap_err();
        assert!(matches!(err, ReaderError::DocumentEmpty { .. }));
    }

    #[test]
    fn pdf_ingest_uses_dump_metadata() {
        let page = PdfPage {
            index: 0,
            height: 800.0,
            fragments: vec![
                TextFragment::new("Plain", 12.0, 400.0),
                TextFragment::new("body", 12.0, 400.0),
                TextFragment::new("text.", 12.0, 400.0),
            ],
        };
        let mut dump = FragmentDump::new(vec![page]);
        dump.metadata.author = Some("A. Writer".to_string());
        let mut config = AppConfig::default();
        config.classifier.sample_pages = 1;

        let book = ingest_file(Path::new("/tmp/paper.pdf"), Some(&mut dump), &config, None).unwrap();
        assert_eq!(book.title, "paper");
        assert_eq!(book.author, "A. Writer");
        assert_eq!(book.text, "Plain body text.");
        assert_eq!(book.format, BookFormat::Pdf);
    }
}
