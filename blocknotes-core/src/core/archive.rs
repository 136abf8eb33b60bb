//! Retention policy and the note archive.
//!
//! Active notes beyond the configured capacity, ranked by `modified_at`
//! (newest first, ties broken by newest ID), are moved into `notes_archive` /
//! `blocks_archive`. Deleting a note goes through the same path, so an active
//! note is never destroyed without an archive copy. Each archival copies the
//! note and its blocks, removes them from the active tables and drops the
//! search entry, all inside the caller's scope.

use crate::core::ordering::{next_modified_at, now_millis};
use crate::core::search;
use crate::{ArchivePreview, ArchivedBlock, ArchivedNote, NotesError, Result, Scope};

/// Archives every active note ranked beyond `capacity`.
///
/// Returns the archive IDs that were created, in the order the notes were
/// ranked.
pub fn enforce_capacity(scope: &mut Scope, capacity: usize) -> Result<Vec<i64>> {
    let excess: Vec<i64> = scope.query_map(
        "SELECT id FROM notes
         ORDER BY modified_at DESC, id DESC
         LIMIT -1 OFFSET ?1",
        [capacity as i64],
        |row| row.get(0),
    )?;

    let mut archived = Vec::with_capacity(excess.len());
    for note_id in excess {
        archived.push(archive_note_by_id(scope, note_id)?);
    }
    if !archived.is_empty() {
        log::info!(
            "Capacity {capacity} exceeded; archived {} note(s)",
            archived.len()
        );
    }
    Ok(archived)
}

/// Moves one active note and its blocks into the archive.
///
/// `created_at` and `modified_at` are preserved, `archived_at` is stamped now,
/// and block `sort_order`/content are copied as they are. Returns the new
/// archive ID.
///
/// # Errors
///
/// Returns [`NotesError::NoteNotFound`] if the note is not active.
pub fn archive_note_by_id(scope: &mut Scope, note_id: i64) -> Result<i64> {
    let (title, created_at, modified_at): (String, i64, i64) = scope
        .query_row_optional(
            "SELECT title, created_at, modified_at FROM notes WHERE id = ?1",
            [note_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?
        .ok_or(NotesError::NoteNotFound(note_id))?;

    let archived_id = scope.insert(
        "INSERT INTO notes_archive (created_at, modified_at, archived_at, title)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![created_at, modified_at, now_millis(), title],
    )?;
    scope.execute(
        "INSERT INTO blocks_archive (note_id, sort_order, content)
         SELECT ?1, sort_order, content FROM blocks
         WHERE note_id = ?2
         ORDER BY sort_order ASC, id ASC",
        [archived_id, note_id],
    )?;

    scope.execute("DELETE FROM blocks WHERE note_id = ?1", [note_id])?;
    scope.execute("DELETE FROM notes WHERE id = ?1", [note_id])?;
    search::remove_entry(scope, note_id)?;

    log::info!("Archived note {note_id} as {archived_id}");
    Ok(archived_id)
}

/// Brings an archived note back as a new active note and re-applies the
/// capacity policy. Returns the new note ID.
///
/// The note gets a fresh ID and the newest `modified_at`; `created_at`, block
/// order and content are kept. The archive rows are removed.
///
/// # Errors
///
/// Returns [`NotesError::ArchivedNoteNotFound`] if `archived_id` is not in the
/// archive.
pub fn restore_archived_note(
    scope: &mut Scope,
    archived_id: i64,
    delimiter: &str,
    capacity: usize,
) -> Result<i64> {
    let (title, created_at): (String, i64) = scope
        .query_row_optional(
            "SELECT title, created_at FROM notes_archive WHERE id = ?1",
            [archived_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
        .ok_or(NotesError::ArchivedNoteNotFound(archived_id))?;

    let modified_at = next_modified_at(scope)?;
    let note_id = scope.insert(
        "INSERT INTO notes (title, created_at, modified_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![title, created_at, modified_at],
    )?;
    scope.execute(
        "INSERT INTO blocks (note_id, sort_order, content)
         SELECT ?1, sort_order, content FROM blocks_archive
         WHERE note_id = ?2
         ORDER BY sort_order ASC, id ASC",
        [note_id, archived_id],
    )?;
    scope.execute("DELETE FROM blocks_archive WHERE note_id = ?1", [archived_id])?;
    scope.execute("DELETE FROM notes_archive WHERE id = ?1", [archived_id])?;

    search::rebuild_entry(scope, note_id, delimiter)?;
    log::info!("Restored archived note {archived_id} as {note_id}");

    enforce_capacity(scope, capacity)?;
    Ok(note_id)
}

/// Permanently deletes every archived note and block. Returns the number of
/// archived notes removed.
pub fn clear_archive(scope: &mut Scope) -> Result<usize> {
    scope.execute("DELETE FROM blocks_archive", [])?;
    let removed = scope.execute("DELETE FROM notes_archive", [])?;
    log::info!("Cleared {removed} archived note(s)");
    Ok(removed)
}

/// Lists archived notes, most recently archived first.
///
/// Entries with a missing or empty title are left out. Notes archived
/// without blocks are listed with a `block_count` of zero.
pub fn list_archive_previews(scope: &mut Scope) -> Result<Vec<ArchivePreview>> {
    let rows: Vec<Option<ArchivePreview>> = scope.query_map(
        "SELECT n.id, n.title, COUNT(b.id)
         FROM notes_archive n
         LEFT JOIN blocks_archive b ON b.note_id = n.id
         GROUP BY n.id
         ORDER BY n.archived_at DESC, n.id DESC",
        [],
        |row| {
            Ok(preview_from_parts(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
            ))
        },
    )?;
    Ok(rows.into_iter().flatten().collect())
}

/// Fetches an archived note with its blocks in `sort_order`.
///
/// # Errors
///
/// Returns [`NotesError::ArchivedNoteNotFound`] if `archived_id` is not in the
/// archive.
pub fn get_archived_note(scope: &mut Scope, archived_id: i64) -> Result<ArchivedNote> {
    let mut note = scope
        .query_row_optional(
            "SELECT id, title, created_at, modified_at, archived_at
             FROM notes_archive WHERE id = ?1",
            [archived_id],
            |row| {
                Ok(ArchivedNote {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                    modified_at: row.get(3)?,
                    archived_at: row.get(4)?,
                    blocks: Vec::new(),
                })
            },
        )?
        .ok_or(NotesError::ArchivedNoteNotFound(archived_id))?;

    note.blocks = scope.query_map(
        "SELECT id, note_id, sort_order, content FROM blocks_archive
         WHERE note_id = ?1
         ORDER BY sort_order ASC, id ASC",
        [archived_id],
        |row| {
            Ok(ArchivedBlock {
                id: row.get(0)?,
                note_id: row.get(1)?,
                sort_order: row.get(2)?,
                content: row.get(3)?,
            })
        },
    )?;
    Ok(note)
}

fn preview_from_parts(
    id: i64,
    title: Option<String>,
    block_count: Option<i64>,
) -> Option<ArchivePreview> {
    match (title, block_count) {
        (Some(title), Some(block_count)) if !title.is_empty() => Some(ArchivePreview {
            id,
            title,
            block_count,
        }),
        _ => None,
    }
}
