use super::source::TextFragment;
use super::structure::DocumentStructure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static CAPTION_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(Figure|Fig\.|Table|Equation|Eq\.|Algorithm|Appendix)")
        .expect("static regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Body,
    Title,
    Caption,
    Footnote,
    HeaderFooter,
    Unknown,
}

impl Classification {
    /// Unknown text is kept: dropping real prose is worse than keeping noise.
    pub fn is_retained(self) -> bool {
        matches!(
            self,
            Classification::Body | Classification::Title | Classification::Unknown
        )
    }
}

/// Empirical thresholds for fragment classification. Ratios are relative to
/// the body font height, fractions to the page height.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    pub header_zone_fraction: f32,
    pub footer_zone_fraction: f32,
    /// Header/footer text is at most this tall.
    pub header_footer_height_ratio: f32,
    /// Captions and footnotes are shorter than this.
    pub caption_height_ratio: f32,
    pub footnote_zone_fraction: f32,
    pub title_height_ratio: f32,
    pub body_tolerance_ratio: f32,
    pub body_band_low_fraction: f32,
    pub body_band_high_fraction: f32,
    /// Baseline jump that starts a new line in the output.
    pub line_break_delta: f32,
    pub sample_pages: usize,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        ClassifierThresholds {
            header_zone_fraction: 0.9,
            footer_zone_fraction: 0.1,
            header_footer_height_ratio: 0.9,
            caption_height_ratio: 0.85,
            footnote_zone_fraction: 0.2,
            title_height_ratio: 1.2,
            body_tolerance_ratio: 0.15,
            body_band_low_fraction: 0.15,
            body_band_high_fraction: 0.85,
            line_break_delta: 5.0,
            sample_pages: 5,
        }
    }
}

/// Classify one fragment; the first matching rule wins.
pub fn classify_fragment(
    fragment: &TextFragment,
    structure: &DocumentStructure,
    thresholds: &ClassifierThresholds,
) -> Classification {
    let Some(body) = structure.body_font_height.filter(|h| *h > 0.0) else {
        return Classification::Body;
    };
    let y = fragment.y;
    let height = fragment.height;
    let page_height = structure.page_height;

    let in_margin_band = y > structure.header_zone || y < structure.footer_zone;
    if in_margin_band && height <= body * thresholds.header_footer_height_ratio {
        return Classification::HeaderFooter;
    }

    if height < body * thresholds.caption_height_ratio {
        if CAPTION_PREFIX.is_match(fragment.text.trim()) {
            return Classification::Caption;
        }
        if y < page_height * thresholds.footnote_zone_fraction {
            return Classification::Footnote;
        }
    }

    if height > body * thresholds.title_height_ratio {
        return Classification::Title;
    }

    if (height - body).abs() <= body * thresholds.body_tolerance_ratio
        && y > page_height * thresholds.body_band_low_fraction
        && y < page_height * thresholds.body_band_high_fraction
    {
        return Classification::Body;
    }

    Classification::Unknown
}
