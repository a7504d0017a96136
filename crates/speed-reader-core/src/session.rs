//! One open book: playback, reading mode, and periodic progress saves.

use crate::config::{AppConfig, ReadingMode};
use crate::error::Result;
use crate::library::{BookRecord, Bookmark, Library, ReadingProgress};
use crate::scheduler::{PlaybackCommand, PlaybackLimits, PlaybackSnapshot, RsvpScheduler};
use crate::sections::{Section, section_at};
use crate::stats::{CompletedSession, ReadingSession, start_session};
use crate::storage::KeyValueStore;
use crate::text_utils::{estimate_reading_time, segment_words};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderCommand {
    GetSnapshot,
    Playback(PlaybackCommand),
    SwitchMode(ReadingMode),
    SetScroll(f64),
    JumpToBookmark(Bookmark),
    JumpToSection(usize),
}

impl ReaderCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::Playback(command) => command.action(),
            Self::SwitchMode(_) => "reader_switch_mode",
            Self::SetScroll(_) => "reader_set_scroll",
            Self::JumpToBookmark(_) => "reader_jump_to_bookmark",
            Self::JumpToSection(_) => "reader_jump_to_section",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReaderSnapshot {
    pub book_id: String,
    pub title: String,
    pub mode: ReadingMode,
    pub scroll_position: f64,
    pub playback: PlaybackSnapshot,
    pub section_index: Option<usize>,
    pub section_title: Option<String>,
    pub time_remaining: String,
}

#[derive(Debug, Clone)]
pub struct ReaderEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
}

/// What [`ReaderSession::close`] leaves behind.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub progress: ReadingProgress,
    pub completed: CompletedSession,
}

#[derive(Debug)]
pub struct ReaderSession {
    book: BookRecord,
    scheduler: RsvpScheduler,
    mode: ReadingMode,
    scroll_position: f64,
    stats_session: ReadingSession,
    save_interval: Duration,
    last_flush: Instant,
    dirty: bool,
    flush_now: bool,
}

impl ReaderSession {
    /// Open `book` at its saved position (or the start) and begin a stats
    /// session there.
    pub fn open(
        book: BookRecord,
        text: &str,
        progress: Option<ReadingProgress>,
        config: &AppConfig,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Self {
        let tokens = segment_words(text);
        if tokens.len() != book.word_count {
            warn!(
                id = %book.id,
                stored = book.word_count,
                segmented = tokens.len(),
                "Word count differs from the stored record"
            );
        }
        let progress = progress.unwrap_or_else(|| ReadingProgress::fresh(config, wall));
        let scheduler = RsvpScheduler::restore(
            tokens,
            progress.current_index,
            progress.wpm,
            PlaybackLimits::from_config(config),
        );
        let stats_session = start_session(book.id.clone(), scheduler.current_index(), wall);
        info!(
            id = %book.id,
            index = scheduler.current_index(),
            wpm = scheduler.wpm(),
            mode = %progress.mode,
            "Reader session opened"
        );
        Self {
            book,
            scheduler,
            mode: progress.mode,
            scroll_position: progress.scroll_position,
            stats_session,
            save_interval: Duration::from_millis(config.progress_save_interval_ms),
            last_flush: now,
            dirty: false,
            flush_now: false,
        }
    }

    pub fn book(&self) -> &BookRecord {
        &self.book
    }

    pub fn sections(&self) -> &[Section] {
        &self.book.sections
    }

    pub fn mode(&self) -> ReadingMode {
        self.mode
    }

    pub fn scheduler(&self) -> &RsvpScheduler {
        &self.scheduler
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn apply_command(&mut self, command: ReaderCommand, now: Instant) -> ReaderEvent {
        let action = command.action();
        match command {
            ReaderCommand::GetSnapshot => {}
            ReaderCommand::Playback(command) => {
                let starts_playback =
                    matches!(command, PlaybackCommand::Play | PlaybackCommand::TogglePlay);
                if self.mode == ReadingMode::Traditional && starts_playback {
                    debug!(action, "Playback ignored outside RSVP mode");
                } else {
                    self.scheduler.apply_command(command, now);
                    self.dirty = true;
                }
            }
            ReaderCommand::SwitchMode(mode) => self.switch_mode(mode),
            ReaderCommand::SetScroll(offset) => {
                self.scroll_position = offset.max(0.0);
                self.dirty = true;
            }
            ReaderCommand::JumpToBookmark(bookmark) => self.jump_to_bookmark(&bookmark, now),
            ReaderCommand::JumpToSection(index) => match self.book.sections.get(index) {
                Some(section) => {
                    self.scheduler.jump_to(section.start_index, now);
                    self.dirty = true;
                }
                None => debug!(index, "No such section"),
            },
        }
        ReaderEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    /// Advance playback if its deadline passed.
    pub fn handle_tick(&mut self, now: Instant) -> Option<ReaderEvent> {
        if !self.scheduler.tick(now) {
            return None;
        }
        self.dirty = true;
        if !self.scheduler.is_playing() {
            self.flush_now = true;
        }
        Some(ReaderEvent {
            action: "playback_tick",
            snapshot: self.snapshot(),
        })
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let playback = self.scheduler.snapshot();
        let section_index = section_at(&self.book.sections, playback.current_index);
        let remaining = playback.token_count.saturating_sub(playback.current_index);
        ReaderSnapshot {
            book_id: self.book.id.clone(),
            title: self.book.title.clone(),
            mode: self.mode,
            scroll_position: self.scroll_position,
            section_title: section_index.map(|index| self.book.sections[index].title.clone()),
            section_index,
            time_remaining: estimate_reading_time(remaining, playback.wpm),
            playback,
        }
    }

    pub fn progress(&self, wall: DateTime<Utc>) -> ReadingProgress {
        ReadingProgress {
            current_index: self.scheduler.current_index(),
            scroll_position: self.scroll_position,
            mode: self.mode,
            wpm: self.scheduler.wpm(),
            last_read: wall,
        }
    }

    /// Save progress when something changed and the save interval elapsed,
    /// or right away after a mode switch or the end of the text. Returns
    /// whether a save happened. A failed save keeps the session running and
    /// is retried on the next call.
    pub fn maybe_flush<S: KeyValueStore>(
        &mut self,
        library: &mut Library<S>,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Result<bool> {
        if !self.dirty && !self.flush_now {
            return Ok(false);
        }
        if !self.flush_now && now.saturating_duration_since(self.last_flush) < self.save_interval {
            return Ok(false);
        }
        let progress = self.progress(wall);
        if let Err(err) = library.save_progress(&self.book.id, &progress) {
            warn!(id = %self.book.id, "Progress save failed: {err}");
            return Err(err);
        }
        self.last_flush = now;
        self.dirty = false;
        self.flush_now = false;
        Ok(true)
    }

    /// Stop playback, save progress and record the reading session. Both
    /// writes are attempted even if the first fails.
    pub fn close<S: KeyValueStore>(
        mut self,
        library: &mut Library<S>,
        wall: DateTime<Utc>,
    ) -> Result<SessionSummary> {
        self.scheduler.pause();
        let progress = self.progress(wall);
        let saved = library.save_progress(&self.book.id, &progress);
        let end_index = self.scheduler.current_index();
        let completed = library.record_session(&self.stats_session, end_index, wall)?;
        saved?;
        info!(
            id = %self.book.id,
            words_read = completed.words_read,
            duration_secs = completed.duration_secs,
            "Reader session closed"
        );
        Ok(SessionSummary {
            progress,
            completed,
        })
    }

    fn switch_mode(&mut self, mode: ReadingMode) {
        if mode == self.mode {
            return;
        }
        self.scheduler.pause();
        self.mode = mode;
        self.dirty = true;
        self.flush_now = true;
        debug!(%mode, "Reading mode switched");
    }

    fn jump_to_bookmark(&mut self, bookmark: &Bookmark, now: Instant) {
        match bookmark.mode {
            ReadingMode::Rsvp => self.scheduler.jump_to(bookmark.position, now),
            ReadingMode::Traditional => self.scroll_position = bookmark.position as f64,
        }
        self.switch_mode(bookmark.mode);
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{BookFormat, ParsedBook};
    use crate::sections::SectionMarker;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn wall(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, sec).unwrap()
    }

    fn setup(words: usize) -> (Library<MemoryStore>, BookRecord, String) {
        let mut library = Library::new(MemoryStore::default(), AppConfig::default());
        let text = (0..words)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let half = text.chars().count() / 2;
        let record = library
            .add_parsed(
                ParsedBook {
                    title: "Test".to_string(),
                    author: "Someone".to_string(),
                    text: text.clone(),
                    word_count: words,
                    format: BookFormat::Epub,
                    section_markers: vec![
                        SectionMarker::new("One", 0, 1),
                        SectionMarker::new("Two", half, 1),
                    ],
                },
                wall(0),
            )
            .unwrap();
        (library, record, text)
    }

    fn open(
        library: &Library<MemoryStore>,
        record: &BookRecord,
        text: &str,
        now: Instant,
    ) -> ReaderSession {
        let progress = library.get_progress(&record.id).unwrap();
        ReaderSession::open(record.clone(), text, progress, library.config(), now, wall(0))
    }

    #[test]
    fn playback_commands_produce_snapshots() {
        let (library, record, text) = setup(40);
        let now = Instant::now();
        let mut session = open(&library, &record, &text, now);

        let event = session.apply_command(
            ReaderCommand::Playback(PlaybackCommand::SkipForward(10)),
            now,
        );
        assert_eq!(event.action, "playback_skip_forward");
        assert_eq!(event.snapshot.playback.current_index, 10);
        assert_eq!(event.snapshot.playback.word.as_deref(), Some("word10"));
        assert_eq!(event.snapshot.section_title.as_deref(), Some("One"));

        let event = session.apply_command(ReaderCommand::JumpToSection(1), now);
        assert_eq!(event.snapshot.section_index, Some(1));
        assert_eq!(event.snapshot.section_title.as_deref(), Some("Two"));
    }

    #[test]
    fn ticks_advance_while_playing() {
        let (library, record, text) = setup(5);
        let mut now = Instant::now();
        let mut session = open(&library, &record, &text, now);
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::Play), now);

        assert!(session.handle_tick(now).is_none());
        now += session.scheduler().interval();
        let event = session.handle_tick(now).unwrap();
        assert_eq!(event.action, "playback_tick");
        assert_eq!(event.snapshot.playback.current_index, 1);
    }

    #[test]
    fn progress_is_flushed_on_interval_and_restored() {
        let (mut library, record, text) = setup(30);
        let start = Instant::now();
        let mut session = open(&library, &record, &text, start);

        assert!(!session.maybe_flush(&mut library, start, wall(1)).unwrap());
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::JumpTo(12)), start);
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::SetWpm(400)), start);
        let early = start + Duration::from_secs(1);
        assert!(!session.maybe_flush(&mut library, early, wall(1)).unwrap());
        let due = start + Duration::from_secs(5);
        assert!(session.maybe_flush(&mut library, due, wall(5)).unwrap());

        let saved = library.get_progress(&record.id).unwrap().unwrap();
        assert_eq!(saved.current_index, 12);
        assert_eq!(saved.wpm, 400);

        let reopened = open(&library, &record, &text, start);
        assert_eq!(reopened.scheduler().current_index(), 12);
        assert_eq!(reopened.scheduler().wpm(), 400);
    }

    #[test]
    fn mode_switch_pauses_and_flushes_immediately() {
        let (mut library, record, text) = setup(30);
        let now = Instant::now();
        let mut session = open(&library, &record, &text, now);
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::Play), now);

        let event = session.apply_command(ReaderCommand::SwitchMode(ReadingMode::Traditional), now);
        assert!(!event.snapshot.playback.is_playing);
        assert!(session.next_deadline().is_none());
        assert!(session.maybe_flush(&mut library, now, wall(0)).unwrap());
        let saved = library.get_progress(&record.id).unwrap().unwrap();
        assert_eq!(saved.mode, ReadingMode::Traditional);

        let event = session.apply_command(ReaderCommand::Playback(PlaybackCommand::Play), now);
        assert!(!event.snapshot.playback.is_playing);
    }

    #[test]
    fn bookmark_jump_follows_bookmark_mode() {
        let (mut library, record, text) = setup(30);
        let now = Instant::now();
        let mut session = open(&library, &record, &text, now);
        let scroll = library
            .add_bookmark(&record.id, 640, None, ReadingMode::Traditional, wall(0))
            .unwrap();
        let word = library
            .add_bookmark(&record.id, 17, None, ReadingMode::Rsvp, wall(0))
            .unwrap();

        let event = session.apply_command(ReaderCommand::JumpToBookmark(scroll), now);
        assert_eq!(event.snapshot.mode, ReadingMode::Traditional);
        assert_eq!(event.snapshot.scroll_position, 640.0);

        let event = session.apply_command(ReaderCommand::JumpToBookmark(word), now);
        assert_eq!(event.snapshot.mode, ReadingMode::Rsvp);
        assert_eq!(event.snapshot.playback.current_index, 17);
    }

    #[test]
    fn close_saves_progress_and_records_stats() {
        let (mut library, record, text) = setup(100);
        let now = Instant::now();
        let mut session = open(&library, &record, &text, now);
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::Play), now);
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::JumpTo(50)), now);

        let summary = session.close(&mut library, wall(10)).unwrap();
        assert_eq!(summary.completed.words_read, 50);
        assert_eq!(summary.completed.duration_secs, 10);
        assert_eq!(library.get_progress(&record.id).unwrap().unwrap().current_index, 50);
        assert_eq!(library.stats().unwrap().total_words_read, 50);
    }
}
