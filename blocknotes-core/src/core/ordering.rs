//! Dense block ordering within a note.
//!
//! For every note the `sort_order` values of its blocks are exactly
//! `0..n` with no gaps or duplicates once a scope commits. Every function here
//! runs inside the caller's [`Scope`], refreshes the owning note's
//! `modified_at` and rewrites its search content in the same unit of work.

use crate::core::search;
use crate::{Block, NotesError, Result, Scope};
use std::fmt;
use std::str::FromStr;

/// Where a block should go relative to its current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Swap with the previous block.
    Up,
    /// Swap with the next block.
    Down,
    /// Move to position 0.
    Top,
    /// Move to the last position.
    Bottom,
}

impl MoveDirection {
    /// Resolves this direction to a concrete target index for a block at
    /// `current` in a list of `len` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::InvalidMove`] when the block already sits at the
    /// boundary the direction points to.
    pub fn target(self, current: usize, len: usize) -> Result<usize> {
        let last = len.saturating_sub(1);
        match self {
            Self::Up | Self::Top if current == 0 => Err(NotesError::InvalidMove(
                "Block is already first".to_string(),
            )),
            Self::Down | Self::Bottom if current >= last => Err(NotesError::InvalidMove(
                "Block is already last".to_string(),
            )),
            Self::Up => Ok(current - 1),
            Self::Down => Ok(current + 1),
            Self::Top => Ok(0),
            Self::Bottom => Ok(last),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl FromStr for MoveDirection {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(NotesError::ValidationFailed(format!(
                "Direction must be one of: up, down, top, bottom (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetches a single block by ID.
///
/// # Errors
///
/// Returns [`NotesError::BlockNotFound`] if no such block exists.
pub fn get_block(scope: &mut Scope, block_id: i64) -> Result<Block> {
    scope
        .query_row_optional(
            "SELECT id, note_id, sort_order, content FROM blocks WHERE id = ?1",
            [block_id],
            map_block_row,
        )?
        .ok_or(NotesError::BlockNotFound(block_id))
}

/// Returns every block of `note_id` in `sort_order`.
pub fn blocks_for_note(scope: &mut Scope, note_id: i64) -> Result<Vec<Block>> {
    scope.query_map(
        "SELECT id, note_id, sort_order, content FROM blocks
         WHERE note_id = ?1
         ORDER BY sort_order ASC, id ASC",
        [note_id],
        map_block_row,
    )
}

/// Appends a block after the note's current last block.
///
/// # Errors
///
/// Returns [`NotesError::ValidationFailed`] if `content` is empty and
/// [`NotesError::NoteNotFound`] if the note does not exist.
pub fn append(scope: &mut Scope, note_id: i64, content: &str, delimiter: &str) -> Result<Block> {
    require_content(content)?;
    ensure_note_exists(scope, note_id)?;

    let sort_order: i64 = scope.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM blocks WHERE note_id = ?1",
        [note_id],
        |row| row.get(0),
    )?;
    let id = scope.insert(
        "INSERT INTO blocks (note_id, sort_order, content) VALUES (?1, ?2, ?3)",
        rusqlite::params![note_id, sort_order, content],
    )?;

    touch_note(scope, note_id)?;
    search::refresh_content(scope, note_id, delimiter)?;

    Ok(Block {
        id,
        note_id,
        sort_order,
        content: content.to_string(),
    })
}

/// Replaces the content of a block. Unchanged content is a successful no-op.
///
/// # Errors
///
/// Returns [`NotesError::BlockNotFound`] if the block does not exist and
/// [`NotesError::ValidationFailed`] if `content` is empty.
pub fn update_content(
    scope: &mut Scope,
    block_id: i64,
    content: &str,
    delimiter: &str,
) -> Result<Block> {
    let mut block = get_block(scope, block_id)?;
    require_content(content)?;
    if block.content == content {
        return Ok(block);
    }

    scope.execute(
        "UPDATE blocks SET content = ?1 WHERE id = ?2",
        rusqlite::params![content, block_id],
    )?;
    touch_note(scope, block.note_id)?;
    search::refresh_content(scope, block.note_id, delimiter)?;

    block.content = content.to_string();
    Ok(block)
}

/// Moves a block one step or to either end of its note. Returns the note ID.
///
/// The note's order is first re-sequenced to `0..n` from its stored order,
/// then the direction is resolved to a target index and applied with
/// [`move_to_position`]'s shifting rule.
///
/// # Errors
///
/// Returns [`NotesError::BlockNotFound`] if the block does not exist and
/// [`NotesError::InvalidMove`] if it is already at the boundary.
pub fn move_block(
    scope: &mut Scope,
    block_id: i64,
    direction: MoveDirection,
    delimiter: &str,
) -> Result<i64> {
    let block = get_block(scope, block_id)?;
    let ids = resequence(scope, block.note_id)?;
    let current = ids
        .iter()
        .position(|&id| id == block_id)
        .ok_or(NotesError::BlockNotFound(block_id))?;
    let target = direction.target(current, ids.len())?;

    shift_into_place(scope, block.note_id, block_id, current as i64, target as i64)?;
    touch_note(scope, block.note_id)?;
    search::refresh_content(scope, block.note_id, delimiter)?;

    log::debug!("Moved block {block_id} {direction} from {current} to {target}");
    Ok(block.note_id)
}

/// Moves a block to `target`, shifting the blocks in between by one. Returns
/// the note ID. Moving a block onto its own position changes nothing.
///
/// # Errors
///
/// Returns [`NotesError::BlockNotFound`] if the block does not exist and
/// [`NotesError::InvalidMove`] if `target` is outside `0..n`.
pub fn move_to_position(
    scope: &mut Scope,
    block_id: i64,
    target: i64,
    delimiter: &str,
) -> Result<i64> {
    let block = get_block(scope, block_id)?;
    let count = block_count(scope, block.note_id)?;
    if target < 0 || target >= count {
        return Err(NotesError::InvalidMove(format!(
            "Position {target} is outside 0..{count}"
        )));
    }
    if target == block.sort_order {
        return Ok(block.note_id);
    }

    shift_into_place(scope, block.note_id, block_id, block.sort_order, target)?;
    touch_note(scope, block.note_id)?;
    search::refresh_content(scope, block.note_id, delimiter)?;
    Ok(block.note_id)
}

/// Deletes a block and closes the gap it leaves. Returns the note ID.
///
/// # Errors
///
/// Returns [`NotesError::BlockNotFound`] if the block does not exist.
pub fn delete(scope: &mut Scope, block_id: i64, delimiter: &str) -> Result<i64> {
    let block = get_block(scope, block_id)?;

    // Close the gap before removing the row.
    let following: Vec<(i64, i64)> = scope.query_map(
        "SELECT id, sort_order FROM blocks
         WHERE note_id = ?1 AND sort_order > ?2
         ORDER BY sort_order ASC",
        [block.note_id, block.sort_order],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    for (id, sort_order) in following {
        scope.execute(
            "UPDATE blocks SET sort_order = ?1 WHERE id = ?2",
            [sort_order - 1, id],
        )?;
    }
    scope.execute("DELETE FROM blocks WHERE id = ?1", [block_id])?;

    touch_note(scope, block.note_id)?;
    search::refresh_content(scope, block.note_id, delimiter)?;
    Ok(block.note_id)
}

/// Stamps `notes.modified_at` with [`next_modified_at`], making the note the
/// most recently modified one.
///
/// # Errors
///
/// Returns [`NotesError::NoteNotFound`] if the note does not exist.
pub(crate) fn touch_note(scope: &mut Scope, note_id: i64) -> Result<()> {
    let stamp = next_modified_at(scope)?;
    let changed = scope.execute(
        "UPDATE notes SET modified_at = ?1 WHERE id = ?2",
        [stamp, note_id],
    )?;
    if changed == 0 {
        return Err(NotesError::NoteNotFound(note_id));
    }
    Ok(())
}

/// Returns the current time, or one past the newest stored `modified_at` if
/// that is not behind the clock. The result is strictly greater than every
/// active note's stamp.
pub(crate) fn next_modified_at(scope: &mut Scope) -> Result<i64> {
    scope.query_row(
        "SELECT MAX(?1, COALESCE(MAX(modified_at), 0) + 1) FROM notes",
        [now_millis()],
        |row| row.get(0),
    )
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn ensure_note_exists(scope: &mut Scope, note_id: i64) -> Result<()> {
    let exists = scope
        .query_row_optional("SELECT 1 FROM notes WHERE id = ?1", [note_id], |_| Ok(()))?
        .is_some();
    if exists {
        Ok(())
    } else {
        Err(NotesError::NoteNotFound(note_id))
    }
}

pub(crate) fn map_block_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: row.get(0)?,
        note_id: row.get(1)?,
        sort_order: row.get(2)?,
        content: row.get(3)?,
    })
}

fn require_content(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(NotesError::ValidationFailed(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn block_count(scope: &mut Scope, note_id: i64) -> Result<i64> {
    scope.query_row(
        "SELECT COUNT(*) FROM blocks WHERE note_id = ?1",
        [note_id],
        |row| row.get(0),
    )
}

/// Rewrites the note's `sort_order` values to `0..n` following their stored
/// order and returns the block IDs in that order. Only rows whose value
/// changes are written.
fn resequence(scope: &mut Scope, note_id: i64) -> Result<Vec<i64>> {
    let rows: Vec<(i64, i64)> = scope.query_map(
        "SELECT id, sort_order FROM blocks
         WHERE note_id = ?1
         ORDER BY sort_order ASC, id ASC",
        [note_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut ids = Vec::with_capacity(rows.len());
    for (position, (id, sort_order)) in rows.into_iter().enumerate() {
        let position = position as i64;
        if sort_order != position {
            scope.execute(
                "UPDATE blocks SET sort_order = ?1 WHERE id = ?2",
                [position, id],
            )?;
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Moves `block_id` from `current` to `target`.
///
/// Moving up shifts `[target, current)` down the list by one; moving down
/// shifts `(current, target]` up the list by one. Each shifted row is
/// written individually.
fn shift_into_place(
    scope: &mut Scope,
    note_id: i64,
    block_id: i64,
    current: i64,
    target: i64,
) -> Result<()> {
    let (sql, delta) = if target < current {
        (
            "SELECT id, sort_order FROM blocks
             WHERE note_id = ?1 AND sort_order >= ?2 AND sort_order < ?3 AND id != ?4",
            1,
        )
    } else {
        (
            "SELECT id, sort_order FROM blocks
             WHERE note_id = ?1 AND sort_order <= ?2 AND sort_order > ?3 AND id != ?4",
            -1,
        )
    };
    let shifted: Vec<(i64, i64)> = scope.query_map(
        sql,
        [note_id, target, current, block_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    for (id, sort_order) in shifted {
        scope.execute(
            "UPDATE blocks SET sort_order = ?1 WHERE id = ?2",
            [sort_order + delta, id],
        )?;
    }
    scope.execute(
        "UPDATE blocks SET sort_order = ?1 WHERE id = ?2",
        [target, block_id],
    )?;
    Ok(())
}
