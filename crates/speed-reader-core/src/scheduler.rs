//! RSVP playback scheduler.
//!
//! One word is shown at a time and advanced on a fixed interval derived from
//! the words-per-minute setting. The scheduler never sleeps or spawns; the
//! caller passes `now` into every time-sensitive method and waits until
//! [`RsvpScheduler::next_deadline`] before calling [`RsvpScheduler::tick`].
//! Only one deadline is ever outstanding, so two advances cannot race.

use crate::config::AppConfig;
use crate::orp::OrpSplit;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackLimits {
    pub min_wpm: u32,
    pub max_wpm: u32,
    pub wpm_step: u32,
    pub skip_count: usize,
}

impl Default for PlaybackLimits {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl PlaybackLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_wpm: config.min_wpm,
            max_wpm: config.max_wpm.max(config.min_wpm),
            wpm_step: config.wpm_step.max(1),
            skip_count: config.skip_count,
        }
    }

    pub fn clamp_wpm(&self, wpm: u32) -> u32 {
        wpm.clamp(self.min_wpm.max(1), self.max_wpm.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    TogglePlay,
    SkipForward(usize),
    SkipBackward(usize),
    JumpTo(usize),
    SetWpm(u32),
    IncreaseWpm,
    DecreaseWpm,
    Reset,
}

impl PlaybackCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Play => "playback_play",
            Self::Pause => "playback_pause",
            Self::TogglePlay => "playback_toggle",
            Self::SkipForward(_) => "playback_skip_forward",
            Self::SkipBackward(_) => "playback_skip_backward",
            Self::JumpTo(_) => "playback_jump_to",
            Self::SetWpm(_) => "playback_set_wpm",
            Self::IncreaseWpm => "playback_increase_wpm",
            Self::DecreaseWpm => "playback_decrease_wpm",
            Self::Reset => "playback_reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub current_index: usize,
    pub token_count: usize,
    pub is_playing: bool,
    pub wpm: u32,
    pub progress: f64,
    pub word: Option<String>,
    pub orp: Option<OrpSplit>,
}

impl PlaybackSnapshot {
    pub fn is_finished(&self) -> bool {
        self.token_count > 0 && self.current_index >= self.token_count
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub action: &'static str,
    pub snapshot: PlaybackSnapshot,
}

#[derive(Debug, Clone)]
pub struct RsvpScheduler {
    tokens: Vec<String>,
    current_index: usize,
    is_playing: bool,
    wpm: u32,
    limits: PlaybackLimits,
    deadline: Option<Instant>,
}

impl RsvpScheduler {
    pub fn new(tokens: Vec<String>, wpm: u32, limits: PlaybackLimits) -> Self {
        Self {
            tokens,
            current_index: 0,
            is_playing: false,
            wpm: limits.clamp_wpm(wpm),
            limits,
            deadline: None,
        }
    }

    /// Rehydrate from a saved position. An index past the end means the book
    /// was finished; it is kept so the next `play` restarts from the top.
    pub fn restore(tokens: Vec<String>, index: usize, wpm: u32, limits: PlaybackLimits) -> Self {
        let mut scheduler = Self::new(tokens, wpm, limits);
        scheduler.current_index = index.min(scheduler.tokens.len());
        scheduler
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn limits(&self) -> PlaybackLimits {
        self.limits
    }

    pub fn current_word(&self) -> Option<&str> {
        self.tokens.get(self.current_index).map(String::as_str)
    }

    /// Time between advances: `60000 / wpm` milliseconds.
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / f64::from(self.wpm.max(1)))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn progress(&self) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        (self.current_index as f64 / self.tokens.len() as f64 * 100.0).clamp(0.0, 100.0)
    }

    pub fn play(&mut self, now: Instant) {
        if self.tokens.is_empty() {
            debug!("Ignoring play on an empty token list");
            return;
        }
        if self.current_index >= self.tokens.len() {
            self.current_index = 0;
        }
        self.is_playing = true;
        self.deadline = Some(now + self.interval());
        debug!(index = self.current_index, wpm = self.wpm, "Playback started");
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
        self.deadline = None;
        debug!(index = self.current_index, "Playback paused");
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.is_playing {
            self.pause();
        } else {
            self.play(now);
        }
    }

    /// Advance one word if the pending deadline has passed. Returns whether
    /// the index moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.deadline else {
            return false;
        };
        if !self.is_playing || now < deadline {
            return false;
        }
        self.current_index += 1;
        if self.current_index >= self.tokens.len() {
            self.current_index = self.tokens.len();
            self.is_playing = false;
            self.deadline = None;
            info!(words = self.tokens.len(), "Reached the end of the text");
        } else {
            self.deadline = Some(now + self.interval());
        }
        true
    }

    pub fn skip_forward(&mut self, count: usize, now: Instant) {
        let target = self.current_index.saturating_add(count);
        self.seek(target, now);
    }

    pub fn skip_backward(&mut self, count: usize, now: Instant) {
        let target = self.current_index.saturating_sub(count);
        self.seek(target, now);
    }

    pub fn jump_to(&mut self, index: usize, now: Instant) {
        self.seek(index, now);
    }

    /// The new rate applies from the next re-arm; the pending deadline stays.
    pub fn set_wpm(&mut self, wpm: u32) {
        self.wpm = self.limits.clamp_wpm(wpm);
        debug!(wpm = self.wpm, "Playback speed changed");
    }

    pub fn increase_wpm(&mut self) {
        self.set_wpm(self.wpm.saturating_add(self.limits.wpm_step));
    }

    pub fn decrease_wpm(&mut self) {
        self.set_wpm(self.wpm.saturating_sub(self.limits.wpm_step));
    }

    pub fn reset(&mut self) {
        self.pause();
        self.current_index = 0;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let word = self.current_word().map(str::to_string);
        let orp = word.as_deref().map(OrpSplit::new);
        PlaybackSnapshot {
            current_index: self.current_index,
            token_count: self.tokens.len(),
            is_playing: self.is_playing,
            wpm: self.wpm,
            progress: self.progress(),
            word,
            orp,
        }
    }

    pub fn apply_command(&mut self, command: PlaybackCommand, now: Instant) -> PlaybackEvent {
        let action = command.action();
        match command {
            PlaybackCommand::Play => self.play(now),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::TogglePlay => self.toggle(now),
            PlaybackCommand::SkipForward(count) => self.skip_forward(count, now),
            PlaybackCommand::SkipBackward(count) => self.skip_backward(count, now),
            PlaybackCommand::JumpTo(index) => self.jump_to(index, now),
            PlaybackCommand::SetWpm(wpm) => self.set_wpm(wpm),
            PlaybackCommand::IncreaseWpm => self.increase_wpm(),
            PlaybackCommand::DecreaseWpm => self.decrease_wpm(),
            PlaybackCommand::Reset => self.reset(),
        }
        PlaybackEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    fn seek(&mut self, target: usize, now: Instant) {
        if self.tokens.is_empty() {
            return;
        }
        self.current_index = target.min(self.tokens.len() - 1);
        if self.is_playing {
            self.deadline = Some(now + self.interval());
        }
    }
}
