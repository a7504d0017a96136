//! PDF body-text extraction.
//!
//! The text-extraction primitive is pluggable ([`PdfPrimitive`]). Files are
//! read through [`OxidePdf`]; [`FragmentDump`] replays fragments saved as
//! JSON. This module decides which of the fragments are body text.
//! Sampling a few pages fixes the document's body font height and page
//! zones, then every page is classified fragment by fragment against them.

mod classify;
mod extract;
mod oxide;
mod source;
mod structure;

pub use classify::{Classification, ClassifierThresholds, classify_fragment};
pub use extract::{ExtractionStats, PdfExtraction, extract_body_text, render_page_text};
pub use oxide::OxidePdf;
pub use source::{FragmentDump, PdfMetadata, PdfPage, PdfPrimitive, TextFragment};
pub use structure::{DocumentStructure, analyze_structure};
