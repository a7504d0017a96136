use super::classify::ClassifierThresholds;
use super::source::PdfPage;
use std::collections::BTreeMap;

/// Page geometry statistics measured once per document before any page is
/// classified.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStructure {
    /// Median fragment height across the sample; `None` when the sample held
    /// no text at all.
    pub body_font_height: Option<f32>,
    pub page_height: f32,
    /// Baselines above this are in the running-header band.
    pub header_zone: f32,
    /// Baselines below this are in the running-footer band.
    pub footer_zone: f32,
    pub font_usage: BTreeMap<String, usize>,
    pub sampled_fragments: usize,
}

impl DocumentStructure {
    pub fn has_body_font(&self) -> bool {
        self.body_font_height.is_some_and(|height| height > 0.0)
    }

    /// Most frequently used font in the sample.
    pub fn dominant_font(&self) -> Option<&str> {
        self.font_usage
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(font, _)| font.as_str())
    }
}

/// Measure body font height and page zones from the sample pages.
///
/// Only the first `thresholds.sample_pages` pages are looked at; the caller
/// may pass more and they are ignored.
pub fn analyze_structure(samples: &[PdfPage], thresholds: &ClassifierThresholds) -> DocumentStructure {
    let mut heights = Vec::new();
    let mut font_usage = BTreeMap::new();
    let mut page_height = 0.0f32;

    for page in samples.iter().take(thresholds.sample_pages) {
        page_height = page.height;
        for fragment in page.fragments.iter().filter(|f| !f.is_blank()) {
            heights.push(fragment.height);
            *font_usage.entry(fragment.font.clone()).or_insert(0usize) += 1;
        }
    }

    heights.sort_by(|a, b| a.total_cmp(b));
    let body_font_height = heights
        .get(heights.len() / 2)
        .copied()
        .filter(|height| *height > 0.0);

    DocumentStructure {
        body_font_height,
        page_height,
        header_zone: page_height * thresholds.header_zone_fraction,
        footer_zone: page_height * thresholds.footer_zone_fraction,
        font_usage,
        sampled_fragments: heights.len(),
    }
}
