use crate::error::{ReaderError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One positioned run of text as delivered by the extraction primitive.
///
/// `y` is the baseline in page space with the origin at the bottom edge, so
/// larger values are closer to the top of the page.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct TextFragment {
    pub text: String,
    pub height: f32,
    pub y: f32,
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub page: usize,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, height: f32, y: f32) -> Self {
        TextFragment {
            text: text.into(),
            height,
            y,
            font: String::new(),
            page: 0,
        }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct PdfPage {
    #[serde(default)]
    pub index: usize,
    /// Viewport height at scale 1.0.
    pub height: f32,
    #[serde(default)]
    pub fragments: Vec<TextFragment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, serde::Serialize)]
pub struct PdfMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// The text-extraction primitive: pages of positioned fragments.
pub trait PdfPrimitive {
    fn page_count(&mut self) -> Result<usize>;
    fn page(&mut self, index: usize) -> Result<PdfPage>;
    fn metadata(&mut self) -> Result<PdfMetadata>;
}

/// Fragment dump produced by an external extractor, stored as JSON:
/// `{ "title": …, "author": …, "pages": [{ "height": 792, "fragments": [...] }] }`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, serde::Serialize)]
pub struct FragmentDump {
    #[serde(flatten)]
    pub metadata: PdfMetadata,
    #[serde(default)]
    pub pages: Vec<PdfPage>,
}

impl FragmentDump {
    pub fn new(pages: Vec<PdfPage>) -> Self {
        let mut dump = FragmentDump {
            metadata: PdfMetadata::default(),
            pages,
        };
        dump.reindex();
        dump
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut dump: FragmentDump =
            serde_json::from_str(raw).map_err(|err| ReaderError::parse_failure("PDF", err))?;
        dump.reindex();
        Ok(dump)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            ReaderError::parse_failure("PDF", format!("{}: {err}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    fn reindex(&mut self) {
        for (index, page) in self.pages.iter_mut().enumerate() {
            page.index = index;
            for fragment in &mut page.fragments {
                fragment.page = index;
            }
        }
    }
}

impl PdfPrimitive for FragmentDump {
    fn page_count(&mut self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn page(&mut self, index: usize) -> Result<PdfPage> {
        self.pages.get(index).cloned().ok_or_else(|| {
            ReaderError::parse_failure("PDF", format!("page {index} out of range"))
        })
    }

    fn metadata(&mut self) -> Result<PdfMetadata> {
        Ok(self.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_parses_and_indexes_pages() {
        let mut dump = FragmentDump::from_json(
            r#"{
                "title": "Paper",
                "pages": [
                    { "height": 792, "fragments": [{ "text": "Hello", "height": 12, "y": 400 }] },
                    { "height": 792, "fragments": [{ "text": "Again", "height": 12, "y": 380, "font": "g_d0_f1" }] }
                ]
            }"#,
        )
        .expect("dump parses");
        assert_eq!(dump.page_count().expect("count"), 2);
        let second = dump.page(1).expect("page exists");
        assert_eq!(second.index, 1);
        assert_eq!(second.fragments[0].page, 1);
        assert_eq!(second.fragments[0].font, "g_d0_f1");
        assert_eq!(dump.metadata().expect("meta").title.as_deref(), Some("Paper"));
        assert!(dump.metadata().expect("meta").author.is_none());
    }

    #[test]
    fn malformed_dump_is_a_parse_failure() {
        let err = FragmentDump::from_json("{ not json").expect_err("must fail");
        assert!(matches!(err, ReaderError::ParseFailure { format: "PDF", .. }));
    }

    #[test]
    fn out_of_range_page_is_a_parse_failure() {
        let mut dump = FragmentDump::new(Vec::new());
        assert!(dump.page(0).is_err());
    }
}
