//! Library commands behind the CLI.

use crate::cli::{AddArgs, BookmarkCommand, Command, ReadArgs};
use crate::player;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use speed_reader_core::config::AppConfig;
use speed_reader_core::pdf::{FragmentDump, PdfPrimitive};
use speed_reader_core::scheduler::PlaybackCommand;
use speed_reader_core::storage::FileStore;
use speed_reader_core::text_utils::estimate_reading_time;
use speed_reader_core::{Library, ReaderCommand, ReaderSession};
use std::time::Instant;
use tracing::info;

pub fn dispatch(command: Command, config: &AppConfig) -> Result<()> {
    let store = FileStore::open(&config.data_dir, config.storage_quota_bytes)
        .with_context(|| format!("Failed to open library at {}", config.data_dir))?;
    let mut library = Library::new(store, config.clone());

    match command {
        Command::Add(args) => add(&mut library, args),
        Command::List => list(&library),
        Command::Read(args) => read(&mut library, args),
        Command::Sections { id } => sections(&library, &id),
        Command::Bookmark { command } => bookmark(&mut library, command),
        Command::Delete { id } => {
            library
                .delete_book(&id)
                .with_context(|| format!("Failed to delete {id}"))?;
            println!("Deleted {id}");
            Ok(())
        }
        Command::Stats { days } => stats(&library, days),
    }
}

fn add(library: &mut Library<FileStore>, args: AddArgs) -> Result<()> {
    if !args.file.exists() {
        return Err(anyhow!("File not found: {}", args.file.display()));
    }
    let mut dump = args
        .fragments
        .as_deref()
        .map(FragmentDump::from_path)
        .transpose()
        .context("Failed to read the fragment dump")?;
    let source = dump.as_mut().map(|dump| dump as &mut dyn PdfPrimitive);
    let record = library
        .add_book(&args.file, source, None)
        .with_context(|| format!("Failed to add {}", args.file.display()))?;
    println!(
        "Added {} ({}) by {}: {} words, {} sections",
        record.id,
        record.title,
        record.author,
        record.word_count,
        record.sections.len()
    );
    Ok(())
}

fn list(library: &Library<FileStore>) -> Result<()> {
    let books = library.list_books().context("Failed to read the library")?;
    if books.is_empty() {
        println!("The library is empty. Add a book with `speed-reader add <file>`.");
        return Ok(());
    }
    let wpm = library.config().default_wpm;
    for book in books {
        let percent = library.progress_percentage(&book.id).unwrap_or(0.0);
        println!(
            "{}  {} - {} [{}] {} words, {}, {:.0}% read",
            book.id,
            book.title,
            book.author,
            book.format,
            book.word_count,
            estimate_reading_time(book.word_count, wpm),
            percent
        );
    }
    Ok(())
}

fn read(library: &mut Library<FileStore>, args: ReadArgs) -> Result<()> {
    let book = library
        .get_book(&args.id)
        .with_context(|| format!("Unknown book {}", args.id))?;
    let text = library.book_text(&args.id).context("Book text is missing")?;
    let progress = library.get_progress(&args.id).unwrap_or_else(|err| {
        tracing::warn!("Ignoring unreadable progress: {err}");
        None
    });
    let now = Instant::now();
    let config = library.config().clone();
    let mut session = ReaderSession::open(book, &text, progress, &config, now, Utc::now());
    if let Some(wpm) = args.wpm {
        session.apply_command(ReaderCommand::Playback(PlaybackCommand::SetWpm(wpm)), now);
    }
    if let Some(mode) = args.mode {
        session.apply_command(ReaderCommand::SwitchMode(mode), now);
    }
    info!(id = %args.id, "Opening reader");
    let summary = player::run(session, library, &config)?;
    println!(
        "Read {} words in {}s. Position saved at word {}.",
        summary.completed.words_read, summary.completed.duration_secs, summary.progress.current_index
    );
    Ok(())
}

fn sections(library: &Library<FileStore>, id: &str) -> Result<()> {
    let book = library
        .get_book(id)
        .with_context(|| format!("Unknown book {id}"))?;
    if book.sections.is_empty() {
        println!("No sections found in {}", book.title);
        return Ok(());
    }
    for (number, section) in book.sections.iter().enumerate() {
        let indent = "  ".repeat(usize::from(section.level.saturating_sub(1)));
        println!(
            "{:>3}. {indent}{} (words {}-{}, {} words)",
            number + 1,
            section.title,
            section.start_index,
            section.end_index,
            section.word_count()
        );
    }
    Ok(())
}

fn bookmark(library: &mut Library<FileStore>, command: BookmarkCommand) -> Result<()> {
    match command {
        BookmarkCommand::Add {
            id,
            position,
            note,
            mode,
        } => {
            let bookmark = library
                .add_bookmark(&id, position, note, mode, Utc::now())
                .with_context(|| format!("Failed to bookmark {id}"))?;
            println!("Bookmark {} at {} ({})", bookmark.id, bookmark.position, bookmark.mode);
        }
        BookmarkCommand::List { id } => {
            let bookmarks = library.bookmarks(&id).context("Failed to read bookmarks")?;
            if bookmarks.is_empty() {
                println!("No bookmarks");
            }
            for bookmark in bookmarks {
                println!(
                    "{}  {:>8} {:<12} {}  {}",
                    bookmark.id,
                    bookmark.position,
                    bookmark.mode,
                    bookmark.timestamp.format("%Y-%m-%d %H:%M"),
                    bookmark.note.as_deref().unwrap_or("")
                );
            }
        }
        BookmarkCommand::Delete { id, bookmark_id } => {
            if library.delete_bookmark(&id, &bookmark_id)? {
                println!("Deleted bookmark {bookmark_id}");
            } else {
                println!("No bookmark {bookmark_id} for {id}");
            }
        }
    }
    Ok(())
}

fn stats(library: &Library<FileStore>, days: usize) -> Result<()> {
    let stats = library.stats().context("Failed to read statistics")?;
    let now = Utc::now();
    let today = stats.today_stats(now);
    println!(
        "Total: {} words in {} min",
        stats.total_words_read,
        stats.total_time_reading_secs / 60
    );
    if let Some(wpm) = stats.average_wpm() {
        println!("Average speed: {wpm:.0} wpm");
    }
    println!(
        "Today: {} words in {} min",
        today.words_read,
        today.time_reading_secs / 60
    );
    for (date, day) in stats.recent_stats(days, now) {
        println!("  {date}  {:>7} words  {:>4} min", day.words_read, day.time_reading_secs / 60);
    }
    println!("Sessions logged: {}", stats.sessions.len());
    Ok(())
}
