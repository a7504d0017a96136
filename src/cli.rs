use clap::{Args, Parser, Subcommand};
use speed_reader_core::config::ReadingMode;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "RSVP speed reader for EPUB and PDF books")]
pub struct Cli {
    /// Configuration file.
    #[arg(long, global = true, default_value = "conf/config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an EPUB or PDF to the library.
    Add(AddArgs),
    /// List books with their reading progress.
    List,
    /// Open a book in the reader.
    Read(ReadArgs),
    /// Show a book's sections.
    Sections { id: String },
    Bookmark {
        #[command(subcommand)]
        command: BookmarkCommand,
    },
    /// Remove a book with its progress and bookmarks.
    Delete { id: String },
    /// Reading statistics.
    Stats {
        /// Number of recent days to show.
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub file: PathBuf,

    /// Read a PDF's text from a JSON fragment dump instead of the file itself.
    #[arg(long)]
    pub fragments: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    pub id: String,

    /// Start at this speed instead of the saved one.
    #[arg(long)]
    pub wpm: Option<u32>,

    /// `rsvp` or `traditional`.
    #[arg(long)]
    pub mode: Option<ReadingMode>,
}

#[derive(Debug, Subcommand)]
pub enum BookmarkCommand {
    Add {
        id: String,
        /// Word index (rsvp) or scroll offset (traditional).
        position: usize,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, default_value_t = ReadingMode::Rsvp)]
        mode: ReadingMode,
    },
    List {
        id: String,
    },
    Delete {
        id: String,
        bookmark_id: String,
    },
}
