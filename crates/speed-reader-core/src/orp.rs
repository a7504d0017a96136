//! Optimal Recognition Point.
//!
//! The ORP is the letter the reader's eye fixates on. The display pins that
//! letter to a fixed column: the prefix is drawn right-aligned ending at the
//! column, the anchor sits on it, and the suffix starts right after it, so
//! the anchor never moves as word length changes.

/// Fixation index for a word, in characters.
pub fn orp_index(word: &str) -> usize {
    orp_index_for_len(word.chars().count())
}

pub fn orp_index_for_len(len: usize) -> usize {
    match len {
        0..=1 => 0,
        2..=5 => 1,
        6..=9 => 2,
        _ => 3,
    }
}

/// A word cut around its anchor letter.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct OrpSplit {
    pub before: String,
    pub anchor: String,
    pub after: String,
}

impl OrpSplit {
    pub fn new(word: &str) -> Self {
        if word.is_empty() {
            return Self::default();
        }
        let index = orp_index(word);
        let mut before = String::new();
        let mut anchor = String::new();
        let mut after = String::new();
        for (pos, ch) in word.chars().enumerate() {
            if pos < index {
                before.push(ch);
            } else if pos == index {
                anchor.push(ch);
            } else {
                after.push(ch);
            }
        }
        Self {
            before,
            anchor,
            after,
        }
    }

    /// Left padding (in characters) that puts the anchor on `center_column`.
    pub fn left_padding(&self, center_column: usize) -> usize {
        center_column.saturating_sub(self.before.chars().count())
    }
}
