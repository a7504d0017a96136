//! The book library: records, texts, progress, bookmarks and stats over a
//! [`KeyValueStore`].
//!
//! Layout: `books` holds the record list, `book_text/<id>` the cleaned text,
//! `progress/<id>` the last position, `bookmarks/<id>` the bookmark list and
//! `stats` the reading statistics. Every value is JSON.

use crate::cancellation::CancellationToken;
use crate::config::{AppConfig, ReadingMode};
use crate::error::{ReaderError, Result};
use crate::ingest::{self, BookFormat, ParsedBook};
use crate::pdf::PdfPrimitive;
use crate::sections::{Section, locate_sections_in_tokens};
use crate::stats::{CompletedSession, ReadingSession, ReadingStats};
use crate::storage::{KeyValueStore, get_json, set_json};
use crate::text_utils::segment_words;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

const BOOKS_KEY: &str = "books";
const STATS_KEY: &str = "stats";

fn text_key(id: &str) -> String {
    format!("book_text/{id}")
}

fn progress_key(id: &str) -> String {
    format!("progress/{id}")
}

fn bookmarks_key(id: &str) -> String {
    format!("bookmarks/{id}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub format: BookFormat,
    pub word_count: usize,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub current_index: usize,
    #[serde(default)]
    pub scroll_position: f64,
    #[serde(default)]
    pub mode: ReadingMode,
    pub wpm: u32,
    pub last_read: DateTime<Utc>,
}

impl ReadingProgress {
    /// Progress for a book that has never been opened.
    pub fn fresh(config: &AppConfig, now: DateTime<Utc>) -> Self {
        Self {
            current_index: 0,
            scroll_position: 0.0,
            mode: config.default_mode,
            wpm: config.default_wpm,
            last_read: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    /// Word index in RSVP mode, scroll offset in traditional mode.
    pub position: usize,
    #[serde(default)]
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub mode: ReadingMode,
}

pub struct Library<S: KeyValueStore> {
    store: S,
    config: AppConfig,
}

impl<S: KeyValueStore> Library<S> {
    pub fn new(store: S, config: AppConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse a file and add it to the library.
    pub fn add_book(
        &mut self,
        path: &Path,
        pdf_source: Option<&mut dyn PdfPrimitive>,
        cancel: Option<&CancellationToken>,
    ) -> Result<BookRecord> {
        let parsed = ingest::ingest_file(path, pdf_source, &self.config, cancel)?;
        self.add_parsed(parsed, Utc::now())
    }

    pub fn add_parsed(&mut self, parsed: ParsedBook, now: DateTime<Utc>) -> Result<BookRecord> {
        let tokens = segment_words(&parsed.text);
        let sections = locate_sections_in_tokens(&tokens, &parsed.section_markers);
        let record = BookRecord {
            id: Uuid::new_v4().to_string(),
            title: parsed.title,
            author: parsed.author,
            format: parsed.format,
            word_count: tokens.len(),
            date_added: now,
            sections,
        };

        let key = text_key(&record.id);
        self.store.set(&key, &parsed.text)?;
        let mut books = self.list_books()?;
        books.push(record.clone());
        if let Err(err) = set_json(&mut self.store, BOOKS_KEY, &books) {
            // Without a record the stored text is unreachable.
            if let Err(cleanup) = self.store.delete(&key) {
                warn!(key = %key, "Could not remove orphaned book text: {cleanup}");
            }
            return Err(err);
        }
        info!(
            id = %record.id,
            title = %record.title,
            words = record.word_count,
            sections = record.sections.len(),
            "Book added"
        );
        Ok(record)
    }

    pub fn list_books(&self) -> Result<Vec<BookRecord>> {
        Ok(get_json(&self.store, BOOKS_KEY)?.unwrap_or_default())
    }

    pub fn get_book(&self, id: &str) -> Result<BookRecord> {
        self.list_books()?
            .into_iter()
            .find(|book| book.id == id)
            .ok_or_else(|| ReaderError::NotFound(id.to_string()))
    }

    pub fn book_text(&self, id: &str) -> Result<String> {
        self.store
            .get(&text_key(id))?
            .ok_or_else(|| ReaderError::NotFound(id.to_string()))
    }

    /// Remove a book with its text, progress and bookmarks.
    pub fn delete_book(&mut self, id: &str) -> Result<()> {
        let mut books = self.list_books()?;
        let before = books.len();
        books.retain(|book| book.id != id);
        if books.len() == before {
            return Err(ReaderError::NotFound(id.to_string()));
        }
        set_json(&mut self.store, BOOKS_KEY, &books)?;
        self.store.delete(&text_key(id))?;
        self.store.delete(&progress_key(id))?;
        self.store.delete(&bookmarks_key(id))?;
        info!(id, "Book deleted");
        Ok(())
    }

    pub fn update_book(
        &mut self,
        id: &str,
        title: Option<String>,
        author: Option<String>,
    ) -> Result<BookRecord> {
        let mut books = self.list_books()?;
        let book = books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or_else(|| ReaderError::NotFound(id.to_string()))?;
        if let Some(title) = title {
            book.title = title;
        }
        if let Some(author) = author {
            book.author = author;
        }
        let updated = book.clone();
        set_json(&mut self.store, BOOKS_KEY, &books)?;
        Ok(updated)
    }

    pub fn get_progress(&self, id: &str) -> Result<Option<ReadingProgress>> {
        get_json(&self.store, &progress_key(id))
    }

    pub fn save_progress(&mut self, id: &str, progress: &ReadingProgress) -> Result<()> {
        set_json(&mut self.store, &progress_key(id), progress)?;
        debug!(id, index = progress.current_index, "Progress saved");
        Ok(())
    }

    pub fn reset_progress(&mut self, id: &str) -> Result<()> {
        self.store.delete(&progress_key(id))
    }

    /// Share of the book already read, 0–100.
    pub fn progress_percentage(&self, id: &str) -> Result<f64> {
        let book = self.get_book(id)?;
        let Some(progress) = self.get_progress(id)? else {
            return Ok(0.0);
        };
        if book.word_count == 0 {
            return Ok(0.0);
        }
        Ok((progress.current_index as f64 / book.word_count as f64 * 100.0).clamp(0.0, 100.0))
    }

    pub fn bookmarks(&self, id: &str) -> Result<Vec<Bookmark>> {
        Ok(get_json(&self.store, &bookmarks_key(id))?.unwrap_or_default())
    }

    pub fn add_bookmark(
        &mut self,
        id: &str,
        position: usize,
        note: Option<String>,
        mode: ReadingMode,
        now: DateTime<Utc>,
    ) -> Result<Bookmark> {
        let book = self.get_book(id)?;
        let position = match mode {
            ReadingMode::Rsvp if position >= book.word_count => {
                warn!(id, position, words = book.word_count, "Bookmark clamped to last word");
                book.word_count.saturating_sub(1)
            }
            _ => position,
        };
        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            position,
            note: note.filter(|note| !note.trim().is_empty()),
            timestamp: now,
            mode,
        };
        let mut bookmarks = self.bookmarks(id)?;
        bookmarks.push(bookmark.clone());
        set_json(&mut self.store, &bookmarks_key(id), &bookmarks)?;
        Ok(bookmark)
    }

    /// Returns whether a bookmark was removed.
    pub fn delete_bookmark(&mut self, id: &str, bookmark_id: &str) -> Result<bool> {
        let mut bookmarks = self.bookmarks(id)?;
        let before = bookmarks.len();
        bookmarks.retain(|bookmark| bookmark.id != bookmark_id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        set_json(&mut self.store, &bookmarks_key(id), &bookmarks)?;
        Ok(true)
    }

    pub fn delete_all_bookmarks(&mut self, id: &str) -> Result<()> {
        self.store.delete(&bookmarks_key(id))
    }

    pub fn stats(&self) -> Result<ReadingStats> {
        Ok(get_json(&self.store, STATS_KEY)?.unwrap_or_default())
    }

    pub fn record_session(
        &mut self,
        session: &ReadingSession,
        end_index: usize,
        now: DateTime<Utc>,
    ) -> Result<CompletedSession> {
        let mut stats = self.stats()?;
        let completed =
            stats.end_session(session, end_index, now, self.config.max_logged_sessions);
        set_json(&mut self.store, STATS_KEY, &stats)?;
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::SectionMarker;
    use crate::stats::start_session;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap()
    }

    fn parsed(words: usize) -> ParsedBook {
        let text = (0..words)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        ParsedBook {
            title: "Sample".to_string(),
            author: "Author".to_string(),
            word_count: words,
            text,
            format: BookFormat::Epub,
            section_markers: vec![SectionMarker::new("Start", 0, 1)],
        }
    }

    fn library() -> Library<MemoryStore> {
        Library::new(MemoryStore::default(), AppConfig::default())
    }

    #[test]
    fn added_book_is_listed_with_sections_and_text() {
        let mut library = library();
        let record = library.add_parsed(parsed(12), now()).unwrap();
        assert_eq!(record.word_count, 12);
        assert_eq!(record.sections.len(), 1);
        assert_eq!(record.sections[0].end_index, 11);
        assert_eq!(library.list_books().unwrap(), vec![record.clone()]);
        assert!(library.book_text(&record.id).unwrap().starts_with("w0 w1"));
    }

    #[test]
    fn delete_removes_everything_for_the_book() {
        let mut library = library();
        let record = library.add_parsed(parsed(5), now()).unwrap();
        let progress = ReadingProgress::fresh(library.config(), now());
        library.save_progress(&record.id, &progress).unwrap();
        library
            .add_bookmark(&record.id, 2, None, ReadingMode::Rsvp, now())
            .unwrap();

        library.delete_book(&record.id).unwrap();
        assert!(library.list_books().unwrap().is_empty());
        // Only the (now empty) book list is left.
        assert_eq!(library.store().len(), 1);
        assert!(matches!(
            library.get_book(&record.id),
            Err(ReaderError::NotFound(_))
        ));
        assert!(matches!(
            library.delete_book(&record.id),
            Err(ReaderError::NotFound(_))
        ));
    }

    #[test]
    fn progress_percentage_tracks_saved_index() {
        let mut library = library();
        let record = library.add_parsed(parsed(200), now()).unwrap();
        assert_eq!(library.progress_percentage(&record.id).unwrap(), 0.0);

        let mut progress = ReadingProgress::fresh(library.config(), now());
        progress.current_index = 50;
        library.save_progress(&record.id, &progress).unwrap();
        assert_eq!(library.progress_percentage(&record.id).unwrap(), 25.0);

        library.reset_progress(&record.id).unwrap();
        assert_eq!(library.get_progress(&record.id).unwrap(), None);
    }

    #[test]
    fn bookmarks_add_clamp_and_delete() {
        let mut library = library();
        let record = library.add_parsed(parsed(10), now()).unwrap();
        let first = library
            .add_bookmark(&record.id, 99, Some("end".to_string()), ReadingMode::Rsvp, now())
            .unwrap();
        assert_eq!(first.position, 9);
        let second = library
            .add_bookmark(&record.id, 480, Some("  ".to_string()), ReadingMode::Traditional, now())
            .unwrap();
        assert_eq!(second.position, 480);
        assert_eq!(second.note, None);
        assert_eq!(library.bookmarks(&record.id).unwrap().len(), 2);

        assert!(library.delete_bookmark(&record.id, &first.id).unwrap());
        assert!(!library.delete_bookmark(&record.id, &first.id).unwrap());
        library.delete_all_bookmarks(&record.id).unwrap();
        assert!(library.bookmarks(&record.id).unwrap().is_empty());
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut library = library();
        let record = library.add_parsed(parsed(3), now()).unwrap();
        let updated = library
            .update_book(&record.id, Some("Renamed".to_string()), None)
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.author, "Author");
        assert_eq!(library.get_book(&record.id).unwrap().title, "Renamed");
    }

    #[test]
    fn quota_failure_leaves_library_unchanged() {
        let mut library = Library::new(MemoryStore::with_quota(8), AppConfig::default());
        let err = library.add_parsed(parsed(20), now()).unwrap_err();
        assert!(matches!(err, ReaderError::StorageQuotaExceeded { .. }));
        assert!(library.list_books().unwrap().is_empty());
    }

    /// Rejects writes to the book list and every delete.
    #[derive(Default)]
    struct StuckStore {
        inner: MemoryStore,
    }

    impl KeyValueStore for StuckStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if key == BOOKS_KEY {
                return Err(ReaderError::StorageQuotaExceeded {
                    what: key.to_string(),
                });
            }
            self.inner.set(key, value)
        }

        fn delete(&mut self, key: &str) -> Result<()> {
            Err(ReaderError::storage(key, "read-only"))
        }
    }

    #[test]
    fn failed_cleanup_keeps_the_original_error() {
        let mut library = Library::new(StuckStore::default(), AppConfig::default());
        let err = library.add_parsed(parsed(3), now()).unwrap_err();
        assert!(matches!(err, ReaderError::StorageQuotaExceeded { .. }));
        assert!(library.list_books().unwrap().is_empty());
        assert_eq!(library.store().inner.len(), 1);
    }

    #[test]
    fn sessions_are_folded_into_stored_stats() {
        let mut library = library();
        let session = start_session("book", 0, now());
        library
            .record_session(&session, 40, now() + chrono::Duration::seconds(8))
            .unwrap();
        let stats = library.stats().unwrap();
        assert_eq!(stats.total_words_read, 40);
        assert_eq!(stats.total_time_reading_secs, 8);
    }
}
