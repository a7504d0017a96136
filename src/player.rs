//! Terminal playback loop.
//!
//! The loop owns the [`ReaderSession`]. A stdin thread and the Ctrl-C handler
//! only send messages over a channel; the loop waits on it until the next
//! word is due, so ticks and commands are handled on one thread.

use anyhow::{Context, Result};
use chrono::Utc;
use speed_reader_core::config::{AppConfig, ReadingMode};
use speed_reader_core::orp::OrpSplit;
use speed_reader_core::scheduler::PlaybackCommand;
use speed_reader_core::session::SessionSummary;
use speed_reader_core::storage::KeyValueStore;
use speed_reader_core::{Library, ReaderCommand, ReaderSession, ReaderSnapshot};
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const IDLE_WAIT: Duration = Duration::from_millis(500);
const PAGE_WORDS: usize = 120;
const HIGHLIGHT: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";
const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command(ReaderCommand),
    NextPage,
    PrevPage,
    Help,
    Quit,
}

pub const HELP: &str = "\
Enter a command and press return:
  (empty) or p   play / pause
  f / b          skip forward / back
  + / -          faster / slower
  j <index>      jump to word
  s <number>     jump to section
  m              switch rsvp / traditional
  n / N          next / previous page (traditional)
  r              back to the first word
  h              this help
  q              quit";

/// Map one line of input to a message. Unknown input is `None`.
pub fn parse_input(line: &str, skip_count: usize, mode: ReadingMode) -> Option<Message> {
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or("");
    let arg = parts.next().and_then(|value| value.parse::<usize>().ok());
    let playback = |command| Some(Message::Command(ReaderCommand::Playback(command)));
    match head {
        "" | "p" | " " => playback(PlaybackCommand::TogglePlay),
        "f" => playback(PlaybackCommand::SkipForward(arg.unwrap_or(skip_count))),
        "b" => playback(PlaybackCommand::SkipBackward(arg.unwrap_or(skip_count))),
        "+" | "=" => playback(PlaybackCommand::IncreaseWpm),
        "-" => playback(PlaybackCommand::DecreaseWpm),
        "r" => playback(PlaybackCommand::Reset),
        "j" => arg.and_then(|index| playback(PlaybackCommand::JumpTo(index))),
        "w" => line
            .split_whitespace()
            .nth(1)
            .and_then(|value| value.parse::<u32>().ok())
            .and_then(|wpm| playback(PlaybackCommand::SetWpm(wpm))),
        "s" => arg
            .filter(|number| *number > 0)
            .map(|number| Message::Command(ReaderCommand::JumpToSection(number - 1))),
        "m" => {
            let next = match mode {
                ReadingMode::Rsvp => ReadingMode::Traditional,
                ReadingMode::Traditional => ReadingMode::Rsvp,
            };
            Some(Message::Command(ReaderCommand::SwitchMode(next)))
        }
        "n" => Some(Message::NextPage),
        "N" => Some(Message::PrevPage),
        "h" | "?" => Some(Message::Help),
        "q" => Some(Message::Quit),
        _ => None,
    }
}

/// Run the reader until the user quits, then close the session.
pub fn run<S: KeyValueStore>(
    mut session: ReaderSession,
    library: &mut Library<S>,
    config: &AppConfig,
) -> Result<SessionSummary> {
    let (tx, rx) = mpsc::channel();
    install_ctrlc(tx.clone())?;
    spawn_stdin_reader(tx, config.skip_count);

    println!("{HELP}");
    render(&session, config);

    loop {
        let now = Instant::now();
        if session.handle_tick(now).is_some() {
            render(&session, config);
        }
        if let Err(err) = session.maybe_flush(library, now, Utc::now()) {
            warn!("Progress not saved yet: {err}");
        }

        let wait = session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);
        let message = match rx.recv_timeout(wait) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let message = match message {
            Message::Command(ReaderCommand::SwitchMode(_)) => {
                // The stdin thread cannot see the current mode; decide here.
                Message::Command(ReaderCommand::SwitchMode(match session.mode() {
                    ReadingMode::Rsvp => ReadingMode::Traditional,
                    ReadingMode::Traditional => ReadingMode::Rsvp,
                }))
            }
            other => other,
        };
        let now = Instant::now();
        match message {
            Message::Quit => break,
            Message::Help => println!("\n{HELP}"),
            Message::NextPage | Message::PrevPage => {
                let current = session.scheduler().current_index();
                let target = if message == Message::NextPage {
                    current.saturating_add(PAGE_WORDS)
                } else {
                    current.saturating_sub(PAGE_WORDS)
                };
                let jump = ReaderCommand::Playback(PlaybackCommand::JumpTo(target));
                session.apply_command(jump, now);
                let index = session.scheduler().current_index();
                session.apply_command(ReaderCommand::SetScroll(index as f64), now);
            }
            Message::Command(command) => {
                let event = session.apply_command(command, now);
                debug!(
                    action = event.action,
                    index = event.snapshot.playback.current_index,
                    "Command applied"
                );
            }
        }
        render(&session, config);
    }

    println!();
    let summary = session
        .close(library, Utc::now())
        .context("Failed to save reading progress")?;
    info!(
        words_read = summary.completed.words_read,
        duration_secs = summary.completed.duration_secs,
        "Reading stopped"
    );
    Ok(summary)
}

fn install_ctrlc(tx: Sender<Message>) -> Result<()> {
    ctrlc::set_handler(move || {
        let _ = tx.send(Message::Quit);
    })
    .context("Failed to install Ctrl-C handler")
}

fn spawn_stdin_reader(tx: Sender<Message>, skip_count: usize) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            // Mode is resolved by the playback loop; any value works here.
            match parse_input(&line, skip_count, ReadingMode::Rsvp) {
                Some(message) => {
                    if tx.send(message).is_err() {
                        return;
                    }
                }
                None => debug!(input = %line.trim(), "Ignoring unknown input"),
            }
        }
        let _ = tx.send(Message::Quit);
    });
}

fn render(session: &ReaderSession, config: &AppConfig) {
    let snapshot = session.snapshot();
    match snapshot.mode {
        ReadingMode::Rsvp => render_word(&snapshot, config.anchor_column),
        ReadingMode::Traditional => render_page(session, &snapshot),
    }
}

fn render_word(snapshot: &ReaderSnapshot, anchor_column: usize) {
    let playback = &snapshot.playback;
    let word = match &playback.orp {
        Some(split) => format_orp(split, anchor_column, true),
        None if playback.token_count > 0 => {
            format!("{:>width$}", "(end)", width = anchor_column + 3)
        }
        None => "(empty)".to_string(),
    };
    let status = format!(
        "{} {:>4} wpm  {:>5.1}%  {}",
        if playback.is_playing { ">" } else { "||" },
        playback.wpm,
        playback.progress,
        snapshot.section_title.as_deref().unwrap_or(""),
    );
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{CLEAR_LINE}{word}    {status}");
    let _ = out.flush();
}

fn render_page(session: &ReaderSession, snapshot: &ReaderSnapshot) {
    let start = snapshot.playback.current_index.min(snapshot.playback.token_count);
    let end = (start + PAGE_WORDS).min(snapshot.playback.token_count);
    let page = session.scheduler().tokens()[start..end].join(" ");
    println!(
        "\n--- words {}-{} of {} ({:.1}%) {}\n{page}",
        start,
        end,
        snapshot.playback.token_count,
        snapshot.playback.progress,
        snapshot.section_title.as_deref().unwrap_or(""),
    );
}

/// Lay out a word so its anchor letter sits at `anchor_column`.
pub fn format_orp(split: &OrpSplit, anchor_column: usize, color: bool) -> String {
    let padding = " ".repeat(split.left_padding(anchor_column));
    if color {
        format!(
            "{padding}{}{HIGHLIGHT}{}{RESET}{}",
            split.before, split.anchor, split.after
        )
    } else {
        format!("{padding}{}{}{}", split.before, split.anchor, split.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_line_toggles_playback() {
        assert_eq!(
            parse_input("", 10, ReadingMode::Rsvp),
            Some(Message::Command(ReaderCommand::Playback(
                PlaybackCommand::TogglePlay
            )))
        );
    }

    #[test]
    fn skips_use_configured_count_unless_given() {
        assert_eq!(
            parse_input("f", 10, ReadingMode::Rsvp),
            Some(Message::Command(ReaderCommand::Playback(
                PlaybackCommand::SkipForward(10)
            )))
        );
        assert_eq!(
            parse_input("b 3", 10, ReadingMode::Rsvp),
            Some(Message::Command(ReaderCommand::Playback(
                PlaybackCommand::SkipBackward(3)
            )))
        );
    }

    #[test]
    fn sections_are_numbered_from_one() {
        assert_eq!(
            parse_input("s 2", 10, ReadingMode::Rsvp),
            Some(Message::Command(ReaderCommand::JumpToSection(1)))
        );
        assert_eq!(parse_input("s 0", 10, ReadingMode::Rsvp), None);
        assert_eq!(parse_input("j", 10, ReadingMode::Rsvp), None);
        assert_eq!(parse_input("xyz", 10, ReadingMode::Rsvp), None);
    }

    #[test]
    fn wpm_outside_u32_is_rejected() {
        assert_eq!(
            parse_input("w 450", 10, ReadingMode::Rsvp),
            Some(Message::Command(ReaderCommand::Playback(
                PlaybackCommand::SetWpm(450)
            )))
        );
        assert_eq!(parse_input("w 4294967596", 10, ReadingMode::Rsvp), None);
        assert_eq!(parse_input("w", 10, ReadingMode::Rsvp), None);
    }

    #[test]
    fn mode_switch_flips_current_mode() {
        assert_eq!(
            parse_input("m", 10, ReadingMode::Traditional),
            Some(Message::Command(ReaderCommand::SwitchMode(ReadingMode::Rsvp)))
        );
    }

    #[test]
    fn anchor_lands_on_the_anchor_column() {
        let split = OrpSplit::new("reading");
        let line = format_orp(&split, 10, false);
        assert_eq!(line.chars().nth(10), Some('a'));
    }
}
