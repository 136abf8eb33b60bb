//! Search mirror maintenance and lookup.
//!
//! Every active note has one row in the `search_entries` FTS5 table, keyed by
//! `rowid = notes.id`, holding the note's title and the contents of its blocks
//! joined in `sort_order` by the configured delimiter. The mirror is only ever
//! written inside the scope that changed the note, so a committed state never
//! has a stale entry.

use crate::{Result, Scope, SearchHit};

/// Shortest term the trigram index can answer; shorter terms use `LIKE`.
const MIN_TRIGRAM_TERM: usize = 3;

/// Adds an entry for a freshly created note with no content yet.
pub fn insert_entry(scope: &mut Scope, note_id: i64, title: &str) -> Result<()> {
    scope.execute(
        "INSERT INTO search_entries (rowid, title, content) VALUES (?1, ?2, '')",
        rusqlite::params![note_id, title],
    )?;
    Ok(())
}

pub fn update_title(scope: &mut Scope, note_id: i64, title: &str) -> Result<()> {
    scope.execute(
        "UPDATE search_entries SET title = ?1 WHERE rowid = ?2",
        rusqlite::params![title, note_id],
    )?;
    Ok(())
}

/// Recomputes the entry's content from the note's current blocks.
///
/// Falls back to a full rebuild when the note has no entry yet.
pub fn refresh_content(scope: &mut Scope, note_id: i64, delimiter: &str) -> Result<()> {
    let content = joined_content(scope, note_id, delimiter)?;
    let changed = scope.execute(
        "UPDATE search_entries SET content = ?1 WHERE rowid = ?2",
        rusqlite::params![content, note_id],
    )?;
    if changed == 0 {
        log::warn!("Search entry for note {note_id} was missing; rebuilding");
        rebuild_entry(scope, note_id, delimiter)?;
    }
    Ok(())
}

pub fn remove_entry(scope: &mut Scope, note_id: i64) -> Result<()> {
    scope.execute("DELETE FROM search_entries WHERE rowid = ?1", [note_id])?;
    Ok(())
}

/// Replaces the entry for `note_id` with one built from the live note.
pub fn rebuild_entry(scope: &mut Scope, note_id: i64, delimiter: &str) -> Result<()> {
    remove_entry(scope, note_id)?;
    let content = joined_content(scope, note_id, delimiter)?;
    scope.execute(
        "INSERT INTO search_entries (rowid, title, content)
         SELECT id, title, ?2 FROM notes WHERE id = ?1",
        rusqlite::params![note_id, content],
    )?;
    Ok(())
}

/// Drops the whole mirror and rebuilds it from the active notes.
///
/// Returns the number of entries written.
pub fn rebuild_all(scope: &mut Scope, delimiter: &str) -> Result<usize> {
    scope.execute("DELETE FROM search_entries", [])?;
    let note_ids: Vec<i64> =
        scope.query_map("SELECT id FROM notes ORDER BY id", [], |row| row.get(0))?;
    for &note_id in &note_ids {
        rebuild_entry(scope, note_id, delimiter)?;
    }
    log::info!("Rebuilt {} search entries", note_ids.len());
    Ok(note_ids.len())
}

/// Finds notes whose title or content contains `term`, case-insensitively.
///
/// Terms of three or more characters go through the trigram index and come
/// back in FTS5 rank order; shorter terms are matched with `LIKE`. Ties, and
/// every `LIKE` result, are ordered by note ID. An empty term matches nothing.
pub fn search(scope: &mut Scope, term: &str, snippet_radius: usize) -> Result<Vec<SearchHit>> {
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(i64, String, String)> = if term.chars().count() >= MIN_TRIGRAM_TERM {
        scope.query_map(
            "SELECT rowid, title, content FROM search_entries
             WHERE search_entries MATCH ?1
             ORDER BY rank, rowid",
            [fts_phrase(term)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?
    } else {
        scope.query_map(
            "SELECT rowid, title, content FROM search_entries
             WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'
             ORDER BY rowid",
            [like_pattern(term)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?
    };

    Ok(rows
        .into_iter()
        .map(|(note_id, title, content)| SearchHit {
            note_id,
            snippet: content_snippet(&content, term, snippet_radius),
            title,
            content,
        })
        .collect())
}

/// Cuts a window of `radius` characters either side of the first
/// case-insensitive occurrence of `term`. Without a match, the window starts
/// at the beginning of `content`. Elided ends are marked with `…`.
pub fn content_snippet(content: &str, term: &str, radius: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    let needle: Vec<char> = term.chars().collect();

    let (from, to) = match find_ignore_case(&chars, &needle) {
        Some(start) => (
            start.saturating_sub(radius),
            (start + needle.len() + radius).min(chars.len()),
        ),
        None => (0, (radius * 2).min(chars.len())),
    };

    let mut snippet = String::new();
    if from > 0 {
        snippet.push('…');
    }
    snippet.extend(&chars[from..to]);
    if to < chars.len() {
        snippet.push('…');
    }
    snippet
}

fn joined_content(scope: &mut Scope, note_id: i64, delimiter: &str) -> Result<String> {
    let contents: Vec<String> = scope.query_map(
        "SELECT content FROM blocks WHERE note_id = ?1 ORDER BY sort_order ASC, id ASC",
        [note_id],
        |row| row.get(0),
    )?;
    Ok(contents.join(delimiter))
}

/// Quotes `term` as a single FTS5 phrase so operators inside it are literal.
fn fts_phrase(term: &str) -> String {
    format!("\"{}\"", term.replace('"', "\"\""))
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn find_ignore_case(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| {
        window
            .iter()
            .zip(needle)
            .all(|(a, b)| a == b || a.to_lowercase().eq(b.to_lowercase()))
    })
}
