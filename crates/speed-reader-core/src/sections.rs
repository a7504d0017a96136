//! Mapping section markers (character offsets) onto word indices.

use crate::text_utils::segment_words;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A heading located by character offset in the cleaned, unsegmented text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMarker {
    pub title: String,
    pub char_offset: usize,
    /// 1 is top level.
    pub level: u8,
}

impl SectionMarker {
    pub fn new(title: impl Into<String>, char_offset: usize, level: u8) -> Self {
        SectionMarker {
            title: title.into(),
            char_offset,
            level,
        }
    }
}

/// A navigable section as an inclusive word-index range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub start_index: usize,
    pub end_index: usize,
    pub level: u8,
}

impl Section {
    pub fn word_count(&self) -> usize {
        self.end_index + 1 - self.start_index
    }

    pub fn contains(&self, word_index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&word_index)
    }
}

/// Segment `text` and locate `markers` in it.
pub fn locate_sections(text: &str, markers: &[SectionMarker]) -> Vec<Section> {
    let tokens = segment_words(text);
    locate_sections_in_tokens(&tokens, markers)
}

/// Locate each marker at the token whose approximate character position is
/// closest to the marker's offset.
///
/// Token positions are rebuilt from the tokens alone (length plus one
/// separating space each), so they drift slightly from the real text where it
/// had runs of whitespace; nearest-match absorbs that. Markers must arrive in
/// document order: one whose offset goes backwards is dropped, as is one that
/// lands on the same word as the marker before it.
pub fn locate_sections_in_tokens(tokens: &[String], markers: &[SectionMarker]) -> Vec<Section> {
    if tokens.is_empty() || markers.is_empty() {
        return Vec::new();
    }

    let positions = cumulative_positions(tokens);
    let mut starts: Vec<(&SectionMarker, usize)> = Vec::with_capacity(markers.len());
    let mut last_offset = 0usize;

    for marker in markers {
        if marker.char_offset < last_offset {
            warn!(
                title = %marker.title,
                offset = marker.char_offset,
                previous = last_offset,
                "Dropping out-of-order section marker"
            );
            continue;
        }
        last_offset = marker.char_offset;

        let start = nearest_token(&positions, marker.char_offset);
        if let Some((previous, previous_start)) = starts.last() {
            if *previous_start == start {
                debug!(
                    title = %marker.title,
                    kept = %previous.title,
                    start,
                    "Section marker shares a start word; keeping the first"
                );
                continue;
            }
        }
        starts.push((marker, start));
    }

    let last_token = tokens.len() - 1;
    starts
        .iter()
        .enumerate()
        .map(|(i, (marker, start))| {
            let end_index = starts
                .get(i + 1)
                .map(|(_, next)| next - 1)
                .unwrap_or(last_token);
            Section {
                title: marker.title.clone(),
                start_index: *start,
                end_index,
                level: marker.level,
            }
        })
        .collect()
}

/// Index of the section containing `word_index`.
pub fn section_at(sections: &[Section], word_index: usize) -> Option<usize> {
    sections.iter().position(|section| section.contains(word_index))
}

fn cumulative_positions(tokens: &[String]) -> Vec<usize> {
    let mut positions = Vec::with_capacity(tokens.len());
    let mut position = 0usize;
    for token in tokens {
        positions.push(position);
        position += token.chars().count() + 1;
    }
    positions
}

/// Forward scan; stops at the first position past `offset`. Ties go to the
/// earlier token.
fn nearest_token(positions: &[usize], offset: usize) -> usize {
    let mut best_index = 0usize;
    let mut best_distance = usize::MAX;
    for (index, position) in positions.iter().enumerate() {
        let distance = position.abs_diff(offset);
        if distance < best_distance {
            best_distance = distance;
            best_index = index;
        }
        if *position > offset {
            break;
        }
    }
    best_index
}
