//! Text cleanup and word segmentation.
//!
//! Everything downstream of ingestion addresses the book by word index, so
//! the segmenter here is the single source of truth for what a "word" is:
//! a maximal run of non-whitespace characters.

use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("static regex is valid"));
static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex is valid"));

/// Collapse space/tab runs, cap blank-line runs at one paragraph break, trim.
pub fn clean_text(text: &str) -> String {
    let collapsed = HORIZONTAL_RUNS.replace_all(text, " ");
    let paragraphs = EXCESS_NEWLINES.replace_all(&collapsed, "\n\n");
    paragraphs.trim().to_string()
}

/// Split text into word tokens on runs of whitespace.
pub fn segment_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Word count without materializing the token list.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Human-readable reading time at `wpm`, e.g. `"42 min"` or `"3h 5m"`.
pub fn estimate_reading_time(word_count: usize, wpm: u32) -> String {
    let wpm = wpm.max(1) as usize;
    let minutes = word_count.div_ceil(wpm);
    if minutes < 60 {
        return format!("{minutes} min");
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_on_whitespace_runs() {
        let words = segment_words("  The quick\tbrown\n\nfox  ");
        assert_eq!(words, vec!["The", "quick", "brown", "fox"]);
    }

    #[test]
    fn empty_and_blank_text_yield_no_tokens() {
        assert!(segment_words("").is_empty());
        assert!(segment_words(" \n\t ").is_empty());
    }

    #[test]
    fn segmentation_is_idempotent_over_single_space_join() {
        let text = "Call me Ishmael.\n\nSome years ago—never mind\thow long precisely—";
        let first = segment_words(text);
        let second = segment_words(&first.join(" "));
        assert_eq!(first, second);
    }

    #[test]
    fn punctuation_stays_attached() {
        assert_eq!(segment_words("Hello, world!"), vec!["Hello,", "world!"]);
    }

    #[test]
    fn clean_text_collapses_spacing_and_blank_lines() {
        let cleaned = clean_text("  One  \t two\n\n\n\n\nthree  ");
        assert_eq!(cleaned, "One two\n\nthree");
    }

    #[test]
    fn count_words_matches_segmenter() {
        let text = "a b  c\n\nd";
        assert_eq!(count_words(text), segment_words(text).len());
    }

    #[test]
    fn reading_time_formats_minutes_and_hours() {
        assert_eq!(estimate_reading_time(0, 300), "0 min");
        assert_eq!(estimate_reading_time(301, 300), "2 min");
        assert_eq!(estimate_reading_time(300 * 65, 300), "1h 5m");
    }
}
