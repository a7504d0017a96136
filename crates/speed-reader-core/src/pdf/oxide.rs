use super::source::{PdfMetadata, PdfPage, PdfPrimitive, TextFragment};
use crate::error::{ReaderError, Result};
use pdf_oxide::PdfDocument;
use pdf_oxide::layout::TextSpan;
use pdf_oxide::object::Object;
use std::path::Path;
use tracing::{debug, info, warn};

/// Text primitive backed by `pdf_oxide` span extraction.
///
/// Span baselines are PDF user-space y values (origin at the bottom edge),
/// which is what [`TextFragment::y`] expects.
pub struct OxidePdf {
    doc: PdfDocument,
}

impl OxidePdf {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = PdfDocument::open(path).map_err(|err| {
            ReaderError::parse_failure("PDF", format!("{}: {err}", path.display()))
        })?;
        info!(path = %path.display(), "Opened PDF");
        Ok(OxidePdf { doc })
    }

    fn info_dictionary(&mut self) -> Result<Option<Object>> {
        let info = match self.doc.trailer().as_dict().and_then(|dict| dict.get("Info")) {
            Some(info) => info.clone(),
            None => return Ok(None),
        };
        match info.as_reference() {
            Some(obj_ref) => self
                .doc
                .load_object(obj_ref)
                .map(Some)
                .map_err(|err| ReaderError::parse_failure("PDF", err)),
            None => Ok(Some(info)),
        }
    }
}

impl PdfPrimitive for OxidePdf {
    fn page_count(&mut self) -> Result<usize> {
        self.doc
            .page_count()
            .map_err(|err| ReaderError::parse_failure("PDF", err))
    }

    fn page(&mut self, index: usize) -> Result<PdfPage> {
        let height = self
            .doc
            .get_page_info(index)
            .map(|page_info| page_info.media_box.height.abs())
            .map_err(|err| ReaderError::parse_failure("PDF", format!("page {index}: {err}")))?;
        let spans = self
            .doc
            .extract_spans(index)
            .map_err(|err| ReaderError::parse_failure("PDF", format!("page {index}: {err}")))?;
        let fragments: Vec<TextFragment> = spans
            .iter()
            .filter_map(|span| span_fragment(span, index))
            .collect();
        debug!(
            page = index,
            spans = spans.len(),
            fragments = fragments.len(),
            "Extracted page spans"
        );
        Ok(PdfPage {
            index,
            height,
            fragments,
        })
    }

    fn metadata(&mut self) -> Result<PdfMetadata> {
        let info = match self.info_dictionary() {
            Ok(Some(info)) => info,
            Ok(None) => return Ok(PdfMetadata::default()),
            Err(err) => {
                warn!("Document info unreadable: {err}");
                return Ok(PdfMetadata::default());
            }
        };
        let field = |name: &str| {
            info.as_dict()
                .and_then(|dict| dict.get(name))
                .and_then(Object::as_string)
                .and_then(decode_text_string)
        };
        Ok(PdfMetadata {
            title: field("Title"),
            author: field("Author"),
        })
    }
}

fn span_fragment(span: &TextSpan, page: usize) -> Option<TextFragment> {
    build_fragment(
        &span.text,
        span.font_size,
        span.bbox.height,
        span.bbox.y,
        &span.font_name,
        page,
    )
}

/// Blank spans are dropped; a span without a usable font size falls back to
/// its box height.
fn build_fragment(
    text: &str,
    font_size: f32,
    box_height: f32,
    baseline: f32,
    font: &str,
    page: usize,
) -> Option<TextFragment> {
    if text.trim().is_empty() {
        return None;
    }
    let height = if font_size.is_finite() && font_size > 0.0 {
        font_size
    } else {
        box_height.abs()
    };
    let mut fragment = TextFragment::new(text, height, baseline).with_font(font);
    fragment.page = page;
    Some(fragment)
}

/// PDF text strings are PDFDocEncoding or UTF-16BE behind a byte-order mark.
fn decode_text_string(bytes: &[u8]) -> Option<String> {
    let decoded = match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    let trimmed = decoded.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_become_fragments_on_their_page() {
        let fragment = build_fragment("Body text", 11.0, 13.5, 700.0, "Times-Roman", 3).unwrap();
        assert_eq!(fragment.text, "Body text");
        assert_eq!(fragment.height, 11.0);
        assert_eq!(fragment.y, 700.0);
        assert_eq!(fragment.font, "Times-Roman");
        assert_eq!(fragment.page, 3);
    }

    #[test]
    fn missing_font_size_uses_box_height() {
        let fragment = build_fragment("x", 0.0, -9.0, 10.0, "", 0).unwrap();
        assert_eq!(fragment.height, 9.0);
        assert!(build_fragment("   ", 12.0, 12.0, 10.0, "", 0).is_none());
    }

    #[test]
    fn info_strings_decode_both_encodings() {
        assert_eq!(decode_text_string(b"Moby Dick ").as_deref(), Some("Moby Dick"));
        let utf16 = [0xFE, 0xFF, 0x00, b'H', 0x00, b'i', 0x00, 0x00];
        assert_eq!(decode_text_string(&utf16).as_deref(), Some("Hi"));
        assert_eq!(decode_text_string(b"  "), None);
    }

    #[test]
    fn unreadable_file_is_a_parse_failure() {
        let path = std::env::temp_dir().join("speed-reader-missing-document.pdf");
        let err = OxidePdf::open(&path).err().unwrap();
        assert!(matches!(err, ReaderError::ParseFailure { .. }));
    }
}
