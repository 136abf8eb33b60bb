//! Error types for the Blocknotes core library.

use thiserror::Error;

/// All errors that can occur within the Blocknotes core library.
#[derive(Debug, Error)]
pub enum NotesError {
    /// A SQLite operation failed, including busy timeouts and constraint violations.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Required text was empty or an identifier was malformed.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A note ID was requested that does not exist among the active notes.
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// A block ID was requested that does not exist.
    #[error("Block not found: {0}")]
    BlockNotFound(i64),

    /// An archived note ID was requested that does not exist in the archive.
    #[error("Archived note not found: {0}")]
    ArchivedNoteNotFound(i64),

    /// A move does not apply at the block's current position.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// A statement was issued on a scope that has already committed or rolled back.
    #[error("Scope is no longer open")]
    ScopeClosed,

    /// A statement inside the scope failed; the scope was rolled back instead of committed.
    #[error("Scope was poisoned by a failed statement and has been rolled back")]
    ScopePoisoned,

    /// The opened file is not a valid Blocknotes database.
    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`NotesError`].
pub type Result<T> = std::result::Result<T, NotesError>;

/// Coarse classification of a [`NotesError`], as seen by the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any write.
    Validation,
    /// The referenced note, block or archive entry is absent.
    NotFound,
    /// The requested move does not apply at a list boundary.
    InvalidMove,
    /// The unit of work failed and was rolled back in full.
    Storage,
}

impl NotesError {
    /// Maps this error onto its [`ErrorKind`].
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::Validation,
            Self::NoteNotFound(_) | Self::BlockNotFound(_) | Self::ArchivedNoteNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidMove(_) => ErrorKind::InvalidMove,
            Self::Database(_)
            | Self::ScopeClosed
            | Self::ScopePoisoned
            | Self::InvalidDatabase(_)
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Storage,
        }
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationFailed(msg) => msg.clone(),
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::BlockNotFound(_) => "Block no longer exists".to_string(),
            Self::ArchivedNoteNotFound(_) => "Archived note no longer exists".to_string(),
            Self::InvalidMove(msg) => msg.clone(),
            Self::InvalidDatabase(_) => "Could not open notes database".to_string(),
            Self::Database(_) | Self::ScopeClosed | Self::ScopePoisoned => {
                "Failed to save, no changes were made".to_string()
            }
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
