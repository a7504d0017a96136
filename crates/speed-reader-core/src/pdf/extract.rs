use super::classify::{Classification, ClassifierThresholds, classify_fragment};
use super::source::{PdfMetadata, PdfPage, PdfPrimitive};
use super::structure::{DocumentStructure, analyze_structure};
use crate::cancellation::CancellationToken;
use crate::error::{ReaderError, Result};
use crate::text_utils::{clean_text, count_words};
use tracing::{debug, info, warn};

/// Per-document tally of what the classifier kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub total: usize,
    pub kept: usize,
    pub filtered: usize,
    pub captions: usize,
    pub headers: usize,
    pub footnotes: usize,
}

impl ExtractionStats {
    fn record(&mut self, class: Classification) {
        self.total += 1;
        if class.is_retained() {
            self.kept += 1;
            return;
        }
        self.filtered += 1;
        match class {
            Classification::Caption => self.captions += 1,
            Classification::HeaderFooter => self.headers += 1,
            Classification::Footnote => self.footnotes += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct PdfExtraction {
    pub text: String,
    pub word_count: usize,
    pub structure: DocumentStructure,
    pub stats: ExtractionStats,
    pub metadata: PdfMetadata,
}

/// Retained text of one page, in delivery order. A newline is inserted when
/// the baseline moves by more than `line_break_delta`.
pub fn render_page_text(
    page: &PdfPage,
    structure: &DocumentStructure,
    thresholds: &ClassifierThresholds,
    stats: &mut ExtractionStats,
) -> String {
    let mut text = String::new();
    let mut last_y: Option<f32> = None;

    for fragment in page.fragments.iter().filter(|f| !f.is_blank()) {
        let class = classify_fragment(fragment, structure, thresholds);
        stats.record(class);
        if !class.is_retained() {
            continue;
        }
        if let Some(previous) = last_y {
            if (fragment.y - previous).abs() > thresholds.line_break_delta {
                text.push('\n');
            }
        }
        text.push_str(&fragment.text);
        text.push(' ');
        last_y = Some(fragment.y);
    }

    text
}

/// Run the whole classifier over a document.
///
/// Sampling completes before the first page is classified. Fails with
/// [`ReaderError::DocumentEmpty`] when no words survive, however many pages
/// were read.
pub fn extract_body_text(
    source: &mut dyn PdfPrimitive,
    thresholds: &ClassifierThresholds,
    cancel: Option<&CancellationToken>,
) -> Result<PdfExtraction> {
    let page_count = source.page_count()?;
    info!(pages = page_count, "PDF loaded");

    let sample_count = thresholds.sample_pages.min(page_count);
    let samples = (0..sample_count)
        .map(|index| source.page(index))
        .collect::<Result<Vec<_>>>()?;
    let structure = analyze_structure(&samples, thresholds);
    match structure.body_font_height {
        Some(height) => info!(
            body_font_height = height,
            page_height = structure.page_height,
            sampled = structure.sampled_fragments,
            "Measured document structure"
        ),
        None => warn!("No text in sample pages; keeping every fragment"),
    }

    let mut stats = ExtractionStats::default();
    let mut full_text = String::new();
    let mut samples = samples.into_iter();
    for index in 0..page_count {
        if let Some(token) = cancel {
            token.check_cancelled("pdf_pages")?;
        }
        let page = match samples.next() {
            Some(page) => page,
            None => source.page(index)?,
        };
        let page_text = render_page_text(&page, &structure, thresholds, &mut stats);
        if index < 3 {
            debug!(page = index, chars = page_text.len(), "Extracted page");
        }
        full_text.push_str(&page_text);
        full_text.push_str("\n\n");
    }

    info!(
        total = stats.total,
        kept = stats.kept,
        filtered = stats.filtered,
        captions = stats.captions,
        headers = stats.headers,
        footnotes = stats.footnotes,
        "Extraction stats"
    );

    let text = clean_text(&full_text);
    let word_count = count_words(&text);
    if word_count == 0 {
        warn!(pages = page_count, "PDF produced no words");
        return Err(ReaderError::document_empty());
    }

    let metadata = source.metadata().unwrap_or_else(|err| {
        warn!("Failed to read PDF metadata: {err}");
        PdfMetadata::default()
    });

    Ok(PdfExtraction {
        text,
        word_count,
        structure,
        stats,
        metadata,
    })
}
