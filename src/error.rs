//! Error types for board persistence and lookups.

use crate::card::CardId;
use crate::page::PageId;
use thiserror::Error;

/// Errors surfaced by project load/save and id lookups.
#[derive(Error, Debug)]
pub enum BoardError {
    /// Reading or writing a project file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A project file or card record could not be (de)serialized
    #[error("Invalid project data: {0}")]
    Json(#[from] serde_json::Error),

    /// The project file was written by an incompatible format version
    #[error("Unsupported project version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version stored in the file, 0 when missing.
        found: u64,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// A page id did not resolve to a page in the project
    #[error("Unknown page {0}")]
    UnknownPage(PageId),

    /// A card id did not resolve to a card on the page
    #[error("Unknown card {0}")]
    UnknownCard(CardId),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BoardError>;
