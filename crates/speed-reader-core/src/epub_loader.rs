//! EPUB loading utilities.
//!
//! Reading the container is delegated to the `epub` crate; this module walks
//! the spine, turns each item's markup into plain text, and places section
//! markers for the outline. Markers come from the table of contents where a
//! spine item has an entry, and from its `<h1>`–`<h3>` headings otherwise.

use crate::error::{ReaderError, Result};
use crate::sections::SectionMarker;
use crate::text_utils::clean_text;
use epub::doc::{EpubDoc, NavPoint};
use html2text::render::TrivialDecorator;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};

static HEADING_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<h([1-3])\b[^>]*>(.*?)</h[1-3]\s*>").expect("static regex is valid")
});
static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex is valid"));

/// Width handed to `html2text`; large so no hard wraps get baked in.
const TEXT_WIDTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubSpineItem {
    pub href: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpubTocEntry {
    pub title: String,
    pub href: String,
    /// 0 for top-level entries.
    pub depth: usize,
}

/// What the container reader hands back: metadata, spine, and outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpubContent {
    pub title: Option<String>,
    pub author: Option<String>,
    pub spine: Vec<EpubSpineItem>,
    pub toc: Vec<EpubTocEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledText {
    pub text: String,
    pub markers: Vec<SectionMarker>,
}

/// Open an EPUB from disk and collect its spine and TOC.
pub fn read_epub(path: &Path) -> Result<EpubContent> {
    info!(path = %path.display(), "Loading EPUB content");
    let mut doc = EpubDoc::new(path).map_err(|err| ReaderError::parse_failure("EPUB", err))?;

    let mut toc = Vec::new();
    flatten_toc(&doc.toc, 0, &mut toc);

    let mut spine = Vec::new();
    let mut position = 0usize;
    loop {
        position += 1;
        let href = doc
            .get_current_path()
            .map(|path| path.to_string_lossy().replace('\\', "/"))
            .unwrap_or_default();
        match doc.get_current_str() {
            Some((html, _mime)) => spine.push(EpubSpineItem { href, html }),
            None => warn!(item = position, %href, "Skipping unreadable spine item"),
        }
        if !doc.go_next() {
            break;
        }
    }

    let content = EpubContent {
        title: doc.get_title(),
        author: doc.mdata("creator").map(|item| item.value.clone()),
        spine,
        toc,
    };
    info!(
        spine_items = content.spine.len(),
        toc_entries = content.toc.len(),
        "Read EPUB container"
    );
    Ok(content)
}

fn flatten_toc(points: &[NavPoint], depth: usize, out: &mut Vec<EpubTocEntry>) {
    for point in points {
        out.push(EpubTocEntry {
            title: point.label.trim().to_string(),
            href: point.content.to_string_lossy().replace('\\', "/"),
            depth,
        });
        flatten_toc(&point.children, depth + 1, out);
    }
}

/// Join the spine into one cleaned text and place section markers in it.
pub fn assemble_epub(content: &EpubContent) -> AssembledText {
    let mut text = String::new();
    let mut text_chars = 0usize;
    let mut markers = Vec::new();
    let mut toc_used = vec![false; content.toc.len()];

    for (position, item) in content.spine.iter().enumerate() {
        let item_text = clean_text(&html_to_text(&item.html));
        if item_text.is_empty() {
            debug!(item = position, href = %item.href, "Spine item has no text");
            continue;
        }
        if !text.is_empty() {
            text.push_str("\n\n");
            text_chars += 2;
        }
        let item_offset = text_chars;

        let mut matched = false;
        for (entry, used) in content.toc.iter().zip(toc_used.iter_mut()) {
            if *used || !hrefs_match(&item.href, &entry.href) {
                continue;
            }
            *used = true;
            matched = true;
            let within = if entry.href.contains('#') {
                find_chars(&item_text, &entry.title, 0).map(|(offset, _)| offset)
            } else {
                None
            };
            markers.push(SectionMarker::new(
                entry.title.clone(),
                item_offset + within.unwrap_or(0),
                level_from_depth(entry.depth),
            ));
        }
        if !matched {
            markers.extend(
                heading_markers(&item.html, &item_text)
                    .into_iter()
                    .map(|mut marker| {
                        marker.char_offset += item_offset;
                        marker
                    }),
            );
        }

        text_chars += item_text.chars().count();
        text.push_str(&item_text);
        debug!(item = position, chars = item_text.len(), "Parsed spine item");
    }

    // TOC entries can point into one file out of document order.
    markers.sort_by_key(|marker| marker.char_offset);
    AssembledText { text, markers }
}

/// Plain text of an XHTML document, without heading, emphasis or link markers.
pub fn html_to_text(html: &str) -> String {
    match html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(html.as_bytes(), TEXT_WIDTH)
    {
        Ok(clean) => clean,
        Err(err) => {
            warn!("html2text failed: {err}");
            MARKUP_TAG.replace_all(html, " ").into_owned()
        }
    }
}

/// Markers for `<h1>`–`<h3>` tags, with offsets relative to `item_text`.
fn heading_markers(html: &str, item_text: &str) -> Vec<SectionMarker> {
    let item_chars = item_text.chars().count();
    let mut markers = Vec::new();
    let mut search_from = 0usize;

    for captures in HEADING_TAG.captures_iter(html) {
        let level = captures[1].parse::<u8>().unwrap_or(1);
        let title = clean_text(&html_to_text(&captures[2]))
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if title.is_empty() {
            continue;
        }
        let offset = match find_chars(item_text, &title, search_from) {
            Some((offset, byte_end)) => {
                search_from = byte_end;
                offset
            }
            None => {
                let tag_start = captures.get(0).map(|m| m.start()).unwrap_or(0);
                let ratio = tag_start as f64 / html.len().max(1) as f64;
                (ratio * item_chars as f64) as usize
            }
        };
        markers.push(SectionMarker::new(title, offset, level));
    }
    markers
}

/// Case-insensitive search from byte `from`; returns (char offset, byte end).
fn find_chars(haystack: &str, needle: &str, from: usize) -> Option<(usize, usize)> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    let pattern = format!("(?i){}", regex::escape(needle));
    let re = Regex::new(&pattern).ok()?;
    let found = re.find_at(haystack, from)?;
    Some((haystack[..found.start()].chars().count(), found.end()))
}

fn hrefs_match(spine_href: &str, toc_href: &str) -> bool {
    let target = toc_href.split('#').next().unwrap_or(toc_href);
    if target.is_empty() || spine_href.is_empty() {
        return false;
    }
    spine_href.contains(target) || target.contains(spine_href)
}

fn level_from_depth(depth: usize) -> u8 {
    u8::try_from(depth + 1).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(href: &str, html: &str) -> EpubSpineItem {
        EpubSpineItem {
            href: href.to_string(),
            html: html.to_string(),
        }
    }

    fn entry(title: &str, href: &str, depth: usize) -> EpubTocEntry {
        EpubTocEntry {
            title: title.to_string(),
            href: href.to_string(),
            depth,
        }
    }

    #[test]
    fn toc_entries_mark_spine_item_starts() {
        let content = EpubContent {
            spine: vec![
                item("OEBPS/ch1.xhtml", "<html><body><p>Alpha beta gamma.</p></body></html>"),
                item("OEBPS/ch2.xhtml", "<html><body><p>Delta epsilon.</p></body></html>"),
            ],
            toc: vec![entry("One", "ch1.xhtml", 0), entry("Two", "ch2.xhtml", 0)],
            ..EpubContent::default()
        };
        let assembled = assemble_epub(&content);
        assert!(assembled.text.starts_with("Alpha beta gamma."));
        assert!(assembled.text.contains("Delta epsilon."));
        assert_eq!(assembled.markers.len(), 2);
        assert_eq!(assembled.markers[0].char_offset, 0);
        let second = assembled.markers[1].char_offset;
        let tail: String = assembled.text.chars().skip(second).collect();
        assert!(tail.starts_with("Delta"), "marker points at {tail:?}");
    }

    #[test]
    fn nested_toc_depth_becomes_level() {
        let content = EpubContent {
            spine: vec![item(
                "text/part1.html",
                "<body><h1>Part One</h1><p>Intro words.</p><h2 id=\"c1\">Chapter One</h2><p>Body.</p></body>",
            )],
            toc: vec![
                entry("Part One", "text/part1.html", 0),
                entry("Chapter One", "text/part1.html#c1", 1),
            ],
            ..EpubContent::default()
        };
        let assembled = assemble_epub(&content);
        assert_eq!(assembled.markers.len(), 2);
        assert_eq!(assembled.markers[0].level, 1);
        assert_eq!(assembled.markers[1].level, 2);
        assert!(assembled.markers[1].char_offset > assembled.markers[0].char_offset);
    }

    #[test]
    fn headings_are_used_without_toc_match() {
        let content = EpubContent {
            spine: vec![item(
                "chapter.xhtml",
                "<body><h1>The Beginning</h1><p>Once upon a time.</p><h3>Aside</h3><p>More.</p></body>",
            )],
            toc: Vec::new(),
            ..EpubContent::default()
        };
        let assembled = assemble_epub(&content);
        let titles: Vec<&str> = assembled.markers.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["The Beginning", "Aside"]);
        assert_eq!(assembled.markers[0].level, 1);
        assert_eq!(assembled.markers[1].level, 3);
        let aside: String = assembled
            .text
            .chars()
            .skip(assembled.markers[1].char_offset)
            .collect();
        assert!(aside.starts_with("Aside"));
    }

    #[test]
    fn empty_items_are_skipped() {
        let content = EpubContent {
            spine: vec![
                item("blank.xhtml", "<body><div></div></body>"),
                item("ch1.xhtml", "<body><p>Words.</p></body>"),
            ],
            ..EpubContent::default()
        };
        let assembled = assemble_epub(&content);
        assert_eq!(assembled.text, "Words.");
    }

    #[test]
    fn href_matching_ignores_fragments_and_prefixes() {
        assert!(hrefs_match("OEBPS/Text/ch1.xhtml", "Text/ch1.xhtml#start"));
        assert!(hrefs_match("ch1.xhtml", "OEBPS/ch1.xhtml"));
        assert!(!hrefs_match("ch1.xhtml", "ch2.xhtml"));
        assert!(!hrefs_match("ch1.xhtml", "#only-fragment"));
    }

    #[test]
    fn emphasis_reaches_words_without_markers() {
        let content = EpubContent {
            spine: vec![item(
                "ch1.xhtml",
                "<body><h2>Chapter <em>One</em></h2><p>This is <em>very</em> <strong>important</strong> text.</p></body>",
            )],
            ..EpubContent::default()
        };
        let assembled = assemble_epub(&content);
        let words = crate::text_utils::segment_words(&assembled.text);
        assert_eq!(
            words,
            vec!["Chapter", "One", "This", "is", "very", "important", "text."]
        );
        assert_eq!(assembled.markers.len(), 1);
        assert_eq!(assembled.markers[0].title, "Chapter One");
    }

    #[test]
    fn headings_and_links_render_as_bare_text() {
        let text = html_to_text("<h1>Title</h1><p>See <a href=\"x.html\">here</a>.</p>");
        assert!(!text.contains('#'), "{text:?}");
        assert!(!text.contains('['), "{text:?}");
        assert!(text.contains("Title"));
        assert!(text.contains("See here."));
    }
}
