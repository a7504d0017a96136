//! Core of the speed reader: document ingestion, segmentation, section
//! mapping, RSVP playback and the persisted library.

pub mod cancellation;
pub mod config;
pub mod epub_loader;
pub mod error;
pub mod ingest;
pub mod library;
pub mod orp;
pub mod pdf;
pub mod scheduler;
pub mod sections;
pub mod session;
pub mod stats;
pub mod storage;
pub mod text_utils;

pub use error::{ReaderError, Result};
pub use library::{BookRecord, Bookmark, Library, ReadingProgress};
pub use scheduler::{PlaybackCommand, PlaybackSnapshot, RsvpScheduler};
pub use session::{ReaderCommand, ReaderEvent, ReaderSession, ReaderSnapshot};
