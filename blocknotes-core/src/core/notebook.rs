//! High-level notebook operations over a Blocknotes SQLite database.

use crate::core::ordering::{self, next_modified_at, now_millis, touch_note};
use crate::core::{archive, search};
use crate::{
    ArchivePreview, ArchivedNote, Block, MoveDirection, Note, NotePreview, NotebookConfig,
    NotesError, Result, Scope, SearchHit, Storage,
};
use std::path::Path;

/// An open notebook backed by a SQLite database.
///
/// `Notebook` is the interface the routing layer calls. Every method runs as
/// exactly one [`Scope`] opened on a fresh connection: mutations commit as a
/// whole or not at all, and no connection is shared between calls. A
/// `Notebook` can therefore be shared across threads; concurrent writers are
/// serialized by SQLite's write lock.
#[derive(Debug, Clone)]
pub struct Notebook {
    storage: Storage,
    config: NotebookConfig,
}

impl Notebook {
    /// Creates (or upgrades in place) a notebook database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::ValidationFailed`] for an unusable `config`, or
    /// [`NotesError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P, config: NotebookConfig) -> Result<Self> {
        config.validate()?;
        let storage = Storage::create(path, &config)?;
        Ok(Self { storage, config })
    }

    /// Opens an existing notebook database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::InvalidDatabase`] if the file is not a Blocknotes
    /// database.
    pub fn open<P: AsRef<Path>>(path: P, config: NotebookConfig) -> Result<Self> {
        config.validate()?;
        let storage = Storage::open(path, &config)?;
        Ok(Self { storage, config })
    }

    pub fn config(&self) -> &NotebookConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Runs `op` in a fresh write scope, committing on success.
    pub fn write<T>(&self, op: impl FnOnce(&mut Scope) -> Result<T>) -> Result<T> {
        Scope::write(&self.storage)?.run(op)
    }

    /// Runs `op` in a fresh read scope.
    pub fn read<T>(&self, op: impl FnOnce(&mut Scope) -> Result<T>) -> Result<T> {
        Scope::read(&self.storage)?.run(op)
    }

    /// Creates an empty note, then archives whatever now exceeds capacity.
    ///
    /// An empty `title` is replaced with the configured default title.
    pub fn create_note(&self, title: &str) -> Result<Note> {
        let title = if title.is_empty() {
            self.config.default_title.as_str()
        } else {
            title
        };
        self.write(|scope| {
            let created_at = now_millis();
            let modified_at = next_modified_at(scope)?;
            let id = scope.insert(
                "INSERT INTO notes (title, created_at, modified_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![title, created_at, modified_at],
            )?;
            search::insert_entry(scope, id, title)?;
            archive::enforce_capacity(scope, self.config.capacity)?;
            load_note(scope, id)
        })
    }

    /// Fetches a note with its blocks in order.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::NoteNotFound`] if the note is not active.
    pub fn get_note(&self, note_id: i64) -> Result<Note> {
        self.read(|scope| load_note(scope, note_id))
    }

    /// Returns the most recently modified note, if any.
    pub fn latest_note(&self) -> Result<Option<Note>> {
        self.read(|scope| {
            let latest: Option<i64> = scope.query_row_optional(
                "SELECT id FROM notes ORDER BY modified_at DESC, id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )?;
            latest.map(|id| load_note(scope, id)).transpose()
        })
    }

    /// Renames a note.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::ValidationFailed`] if `title` is empty and
    /// [`NotesError::NoteNotFound`] if the note is not active.
    pub fn update_title(&self, note_id: i64, title: &str) -> Result<Note> {
        if title.is_empty() {
            return Err(NotesError::ValidationFailed(
                "Title cannot be empty".to_string(),
            ));
        }
        self.write(|scope| {
            let changed = scope.execute(
                "UPDATE notes SET title = ?1 WHERE id = ?2",
                rusqlite::params![title, note_id],
            )?;
            if changed == 0 {
                return Err(NotesError::NoteNotFound(note_id));
            }
            touch_note(scope, note_id)?;
            search::update_title(scope, note_id, title)?;
            load_note(scope, note_id)
        })
    }

    /// Deletes a note by moving it into the archive. Returns the archive ID.
    pub fn delete_note(&self, note_id: i64) -> Result<i64> {
        self.write(|scope| archive::archive_note_by_id(scope, note_id))
    }

    pub fn append_block(&self, note_id: i64, content: &str) -> Result<Block> {
        self.write(|scope| ordering::append(scope, note_id, content, self.delimiter()))
    }

    pub fn get_block(&self, block_id: i64) -> Result<Block> {
        self.read(|scope| ordering::get_block(scope, block_id))
    }

    pub fn update_block_content(&self, block_id: i64, content: &str) -> Result<Block> {
        self.write(|scope| ordering::update_content(scope, block_id, content, self.delimiter()))
    }

    /// Moves a block and returns its note in the new order.
    pub fn move_block(&self, block_id: i64, direction: MoveDirection) -> Result<Note> {
        self.write(|scope| {
            let note_id = ordering::move_block(scope, block_id, direction, self.delimiter())?;
            load_note(scope, note_id)
        })
    }

    /// Moves a block to an explicit zero-based position and returns its note.
    pub fn move_block_to_position(&self, block_id: i64, target: i64) -> Result<Note> {
        self.write(|scope| {
            let note_id = ordering::move_to_position(scope, block_id, target, self.delimiter())?;
            load_note(scope, note_id)
        })
    }

    pub fn delete_block(&self, block_id: i64) -> Result<()> {
        self.write(|scope| ordering::delete(scope, block_id, self.delimiter()).map(|_| ()))
    }

    /// Lists active notes, most recently modified first.
    pub fn list_note_previews(&self) -> Result<Vec<NotePreview>> {
        self.read(|scope| {
            scope.query_map(
                "SELECT id, title FROM notes ORDER BY modified_at DESC, id DESC",
                [],
                |row| {
                    Ok(NotePreview {
                        id: row.get(0)?,
                        title: row.get(1)?,
                    })
                },
            )
        })
    }

    pub fn list_archive_previews(&self) -> Result<Vec<ArchivePreview>> {
        self.read(archive::list_archive_previews)
    }

    pub fn get_archived_note(&self, archived_id: i64) -> Result<ArchivedNote> {
        self.read(|scope| archive::get_archived_note(scope, archived_id))
    }

    /// Restores an archived note as a new active note and returns it.
    pub fn restore_archived_note(&self, archived_id: i64) -> Result<Note> {
        self.write(|scope| {
            let note_id = archive::restore_archived_note(
                scope,
                archived_id,
                self.delimiter(),
                self.config.capacity,
            )?;
            load_note(scope, note_id)
        })
    }

    /// Permanently empties the archive. Returns the number of notes removed.
    pub fn clear_archive(&self) -> Result<usize> {
        self.write(archive::clear_archive)
    }

    /// Applies the capacity policy now. Returns the archive IDs created.
    pub fn enforce_capacity(&self) -> Result<Vec<i64>> {
        self.write(|scope| archive::enforce_capacity(scope, self.config.capacity))
    }

    pub fn search(&self, term: &str) -> Result<Vec<SearchHit>> {
        self.read(|scope| search::search(scope, term, self.config.snippet_radius))
    }

    /// Rebuilds every search entry from the live notes. Returns the entry count.
    pub fn rebuild_search_index(&self) -> Result<usize> {
        self.write(|scope| search::rebuild_all(scope, self.delimiter()))
    }

    fn delimiter(&self) -> &str {
        &self.config.search_delimiter
    }
}

/// Parses an identifier supplied by a caller (a path or query parameter).
///
/// # Errors
///
/// Returns [`NotesError::ValidationFailed`] unless `text` is a positive integer.
pub fn parse_id(text: &str) -> Result<i64> {
    match text.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(NotesError::ValidationFailed(format!(
            "Invalid identifier: '{text}'"
        ))),
    }
}

fn load_note(scope: &mut Scope, note_id: i64) -> Result<Note> {
    let mut note = scope
        .query_row_optional(
            "SELECT id, title, created_at, modified_at FROM notes WHERE id = ?1",
            [note_id],
            |row| {
                Ok(Note {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    modified_at: row.get(3)?,
                    blocks: Vec::new(),
                })
            },
        )?
        .ok_or(NotesError::NoteNotFound(note_id))?;
    note.blocks = ordering::blocks_for_note(scope, note_id)?;
    Ok(note)
}
