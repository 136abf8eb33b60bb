//! Core library for Blocknotes, a local-first notebook of ordered text blocks.
//!
//! The primary entry point is [`Notebook`], which represents an open SQLite
//! database file. Every mutation goes through a `Notebook` method and runs as
//! a single atomic [`Scope`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    config::{
        config_file_path, load_config, save_config, NotebookConfig, DEFAULT_CAPACITY,
        DEFAULT_SEARCH_DELIMITER, DEFAULT_TITLE,
    },
    error::{ErrorKind, NotesError, Result},
    note::{ArchivePreview, ArchivedBlock, ArchivedNote, Block, Note, NotePreview, SearchHit},
    notebook::{parse_id, Notebook},
    ordering::MoveDirection,
    scope::{Scope, ScopeMode, ScopeState},
    storage::Storage,
};
