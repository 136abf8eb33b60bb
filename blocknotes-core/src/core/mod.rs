//! Internal domain modules for the Blocknotes core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod archive;
pub mod config;
pub mod error;
pub mod note;
pub mod notebook;
pub mod ordering;
pub mod scope;
pub mod search;
pub mod storage;

#[doc(inline)]
pub use config::NotebookConfig;
#[doc(inline)]
pub use error::{ErrorKind, NotesError, Result};
#[doc(inline)]
pub use note::{ArchivePreview, ArchivedBlock, ArchivedNote, Block, Note, NotePreview, SearchHit};
#[doc(inline)]
pub use notebook::Notebook;
#[doc(inline)]
pub use ordering::MoveDirection;
#[doc(inline)]
pub use scope::{Scope, ScopeMode, ScopeState};
#[doc(inline)]
pub use storage::Storage;
