//! Reading session tracking and aggregate statistics.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

pub const DEFAULT_MAX_LOGGED_SESSIONS: usize = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An open reading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingSession {
    pub book_id: String,
    pub start_time: DateTime<Utc>,
    pub start_index: usize,
}

pub fn start_session(
    book_id: impl Into<String>,
    start_index: usize,
    now: DateTime<Utc>,
) -> ReadingSession {
    ReadingSession {
        book_id: book_id.into(),
        start_time: now,
        start_index,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub book_id: String,
    /// `YYYY-MM-DD` of the session end.
    pub date: String,
    pub duration_secs: u64,
    pub words_read: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub words_read: u64,
    pub time_reading_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub total_words_read: u64,
    pub total_time_reading_secs: u64,
    pub sessions: VecDeque<CompletedSession>,
    pub daily_stats: BTreeMap<String, DailyStats>,
}

impl ReadingStats {
    /// Close `session` at `end_index` and fold it into the totals, the day
    /// bucket of `now`, and the session log (oldest entries evicted first).
    pub fn end_session(
        &mut self,
        session: &ReadingSession,
        end_index: usize,
        now: DateTime<Utc>,
        max_logged_sessions: usize,
    ) -> CompletedSession {
        let duration_secs = u64::try_from((now - session.start_time).num_seconds()).unwrap_or(0);
        let words_read = end_index.saturating_sub(session.start_index) as u64;
        let date = now.format(DATE_FORMAT).to_string();

        self.total_words_read += words_read;
        self.total_time_reading_secs += duration_secs;
        let day = self.daily_stats.entry(date.clone()).or_default();
        day.words_read += words_read;
        day.time_reading_secs += duration_secs;

        let completed = CompletedSession {
            book_id: session.book_id.clone(),
            date,
            duration_secs,
            words_read,
        };
        self.sessions.push_back(completed.clone());
        let cap = max_logged_sessions.max(1);
        while self.sessions.len() > cap {
            self.sessions.pop_front();
        }
        debug!(
            book_id = %completed.book_id,
            words_read,
            duration_secs,
            "Reading session recorded"
        );
        completed
    }

    pub fn day_stats(&self, date: NaiveDate) -> DailyStats {
        self.daily_stats
            .get(&date.format(DATE_FORMAT).to_string())
            .copied()
            .unwrap_or_default()
    }

    pub fn today_stats(&self, now: DateTime<Utc>) -> DailyStats {
        self.day_stats(now.date_naive())
    }

    /// The last `days` days ending today, oldest first, with empty days as
    /// zeroes.
    pub fn recent_stats(&self, days: usize, now: DateTime<Utc>) -> Vec<(String, DailyStats)> {
        let today = now.date_naive();
        (0..days)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back as u64)))
            .map(|date| (date.format(DATE_FORMAT).to_string(), self.day_stats(date)))
            .collect()
    }

    pub fn average_wpm(&self) -> Option<f64> {
        if self.total_time_reading_secs == 0 {
            return None;
        }
        Some(self.total_words_read as f64 / (self.total_time_reading_secs as f64 / 60.0))
    }
}
