use blocknotes_core::core::ordering;
use blocknotes_core::{MoveDirection, Note, Notebook, NotebookConfig, NotesError};
use tempfile::TempDir;

fn open_notebook(dir: &TempDir, config: NotebookConfig) -> Notebook {
    Notebook::create(dir.path().join("notes.db"), config).unwrap()
}

fn assert_contiguous(note: &Note) {
    let orders: Vec<i64> = note.blocks.iter().map(|b| b.sort_order).collect();
    let expected: Vec<i64> = (0..note.blocks.len() as i64).collect();
    assert_eq!(orders, expected, "blocks of note {} are not dense", note.id);
}

#[test]
fn sort_order_stays_dense_through_mixed_operations() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Dense")?;

    let mut ids = Vec::new();
    for content in ["a", "b", "c", "d", "e"] {
        ids.push(nb.append_block(note.id, content)?.id);
        assert_contiguous(&nb.get_note(note.id)?);
    }

    assert_contiguous(&nb.move_block(ids[4], MoveDirection::Top)?);
    assert_contiguous(&nb.move_block(ids[0], MoveDirection::Bottom)?);
    assert_contiguous(&nb.move_block(ids[2], MoveDirection::Down)?);
    nb.delete_block(ids[1])?;
    assert_contiguous(&nb.get_note(note.id)?);
    assert_contiguous(&nb.move_block_to_position(ids[3], 0)?);
    nb.delete_block(ids[4])?;

    let after = nb.get_note(note.id)?;
    assert_contiguous(&after);
    assert_eq!(after.block_contents(), vec!["d", "c", "a"]);
    Ok(())
}

#[test]
fn unchanged_update_is_a_no_op() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Same")?;
    let block = nb.append_block(note.id, "steady")?;
    let before = nb.get_note(note.id)?;
    let search_before = nb.search("steady")?;

    std::thread::sleep(std::time::Duration::from_millis(5));
    let returned = nb.update_block_content(block.id, "steady")?;

    assert_eq!(returned, block);
    assert_eq!(nb.get_note(note.id)?.modified_at, before.modified_at);
    assert_eq!(nb.search("steady")?, search_before);
    Ok(())
}

#[test]
fn append_then_delete_restores_previous_blocks() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Round trip")?;
    nb.append_block(note.id, "one")?;
    nb.append_block(note.id, "two")?;
    let before = nb.get_note(note.id)?.blocks;

    let extra = nb.append_block(note.id, "three")?;
    nb.delete_block(extra.id)?;

    assert_eq!(nb.get_note(note.id)?.blocks, before);
    Ok(())
}

#[test]
fn boundary_moves_fail_and_leave_order_unchanged() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Edges")?;
    let first = nb.append_block(note.id, "first")?;
    let last = nb.append_block(note.id, "last")?;
    let before = nb.get_note(note.id)?;

    for (block_id, direction) in [
        (first.id, MoveDirection::Up),
        (first.id, MoveDirection::Top),
        (last.id, MoveDirection::Down),
        (last.id, MoveDirection::Bottom),
    ] {
        let result = nb.move_block(block_id, direction);
        assert!(
            matches!(result, Err(NotesError::InvalidMove(_))),
            "{direction} on block {block_id} should be rejected"
        );
    }

    let after = nb.get_note(note.id)?;
    assert_eq!(after.blocks, before.blocks);
    assert_eq!(after.modified_at, before.modified_at);
    Ok(())
}

#[test]
fn single_block_cannot_move() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Alone")?;
    let only = nb.append_block(note.id, "solo")?;

    for direction in [MoveDirection::Up, MoveDirection::Down] {
        assert!(matches!(
            nb.move_block(only.id, direction),
            Err(NotesError::InvalidMove(_))
        ));
    }
    assert!(matches!(
        nb.move_block(9999, MoveDirection::Up),
        Err(NotesError::BlockNotFound(9999))
    ));
    Ok(())
}

#[test]
fn capacity_archives_least_recent_note() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default().with_capacity(2));

    let n1 = nb.create_note("N1")?;
    let n2 = nb.create_note("N2")?;
    let n3 = nb.create_note("N3")?;

    let archived = nb.list_archive_previews()?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].title, "N1");
    assert_eq!(archived[0].block_count, 0);

    let active: Vec<i64> = nb.list_note_previews()?.iter().map(|p| p.id).collect();
    assert_eq!(active, vec![n3.id, n2.id]);
    assert!(matches!(nb.get_note(n1.id), Err(NotesError::NoteNotFound(_))));
    Ok(())
}

#[test]
fn recently_edited_note_survives_capacity() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default().with_capacity(2));

    let n1 = nb.create_note("N1")?;
    let n2 = nb.create_note("N2")?;
    nb.append_block(n1.id, "edited")?;
    let n3 = nb.create_note("N3")?;

    let active: Vec<i64> = nb.list_note_previews()?.iter().map(|p| p.id).collect();
    assert_eq!(active, vec![n3.id, n1.id]);
    let archived = nb.list_archive_previews()?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].title, "N2");
    Ok(())
}

#[test]
fn new_note_outranks_stamps_ahead_of_the_clock() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default().with_capacity(1));
    let ahead = nb.create_note("Ahead")?;
    nb.write(|scope| {
        scope.execute(
            "UPDATE notes SET modified_at = modified_at + 3600000 WHERE id = ?1",
            [ahead.id],
        )?;
        Ok(())
    })?;

    let fresh = nb.create_note("Fresh")?;
    assert_eq!(fresh.title, "Fresh");

    let active: Vec<i64> = nb.list_note_previews()?.iter().map(|p| p.id).collect();
    assert_eq!(active, vec![fresh.id]);
    assert_eq!(nb.list_archive_previews()?[0].title, "Ahead");
    Ok(())
}

#[test]
fn restore_into_full_notebook_archives_oldest() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default().with_capacity(2));

    let returning = nb.create_note("Returning")?;
    nb.append_block(returning.id, "kept")?;
    let archived_id = nb.delete_note(returning.id)?;
    let oldest = nb.create_note("Oldest")?;
    let newer = nb.create_note("Newer")?;

    let restored = nb.restore_archived_note(archived_id)?;
    assert_eq!(restored.block_contents(), vec!["kept"]);

    let active: Vec<i64> = nb.list_note_previews()?.iter().map(|p| p.id).collect();
    assert_eq!(active, vec![restored.id, newer.id]);
    assert!(matches!(nb.get_note(oldest.id), Err(NotesError::NoteNotFound(_))));

    let archived = nb.list_archive_previews()?;
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].title, "Oldest");
    assert!(nb.search("Oldest")?.is_empty());
    Ok(())
}

#[test]
fn equal_matches_come_back_in_note_id_order() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let first = nb.create_note("Twin")?;
    let second = nb.create_note("Twin")?;
    nb.create_note("Unrelated")?;
    nb.append_block(second.id, "shared text")?;
    nb.append_block(first.id, "shared text")?;

    let ranked: Vec<i64> = nb.search("shared")?.iter().map(|h| h.note_id).collect();
    assert_eq!(ranked, vec![first.id, second.id]);

    let short: Vec<i64> = nb.search("sh")?.iter().map(|h| h.note_id).collect();
    assert_eq!(short, vec![first.id, second.id]);
    Ok(())
}

#[test]
fn restore_preserves_block_order_and_search_content() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Letters")?;
    for content in ["a", "b", "c"] {
        nb.append_block(note.id, content)?;
    }

    let archived_id = nb.delete_note(note.id)?;
    let archived = nb.get_archived_note(archived_id)?;
    assert_eq!(archived.blocks.len(), 3);
    assert_eq!(archived.created_at, note.created_at);

    let restored = nb.restore_archived_note(archived_id)?;
    assert_ne!(restored.id, note.id);
    assert_eq!(restored.title, "Letters");
    assert_eq!(restored.created_at, note.created_at);
    assert_eq!(restored.block_contents(), vec!["a", "b", "c"]);
    assert_contiguous(&restored);

    let hits = nb.search("Letters")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].note_id, restored.id);
    assert_eq!(hits[0].content, "a | b | c");

    assert!(nb.list_archive_previews()?.is_empty());
    assert!(matches!(
        nb.restore_archived_note(archived_id),
        Err(NotesError::ArchivedNoteNotFound(_))
    ));
    Ok(())
}

#[test]
fn search_content_follows_block_order() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Pair")?;
    nb.append_block(note.id, "x")?;
    let y = nb.append_block(note.id, "y")?;

    let hits = nb.search("x")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content, "x | y");

    nb.move_block(y.id, MoveDirection::Up)?;
    assert_eq!(nb.search("Pair")?[0].content, "y | x");

    nb.update_block_content(y.id, "z")?;
    assert_eq!(nb.search("Pair")?[0].content, "z | x");
    assert!(nb.search("y")?.is_empty());
    Ok(())
}

#[test]
fn custom_delimiter_is_used_for_search_content() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let config = NotebookConfig {
        search_delimiter: "\n".to_string(),
        ..NotebookConfig::default()
    };
    let nb = open_notebook(&dir, config);
    let note = nb.create_note("Lines")?;
    nb.append_block(note.id, "one")?;
    nb.append_block(note.id, "two")?;

    assert_eq!(nb.search("Lines")?[0].content, "one\ntwo");
    Ok(())
}

#[test]
fn failed_scope_leaves_no_trace() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Atomic")?;
    let before = nb.get_note(note.id)?;

    let result: Result<(), NotesError> = nb.write(|scope| {
        ordering::append(scope, note.id, "ghost", " | ")?;
        ordering::append(scope, note.id, "", " | ")?;
        Ok(())
    });
    assert!(matches!(result, Err(NotesError::ValidationFailed(_))));

    let after = nb.get_note(note.id)?;
    assert!(after.blocks.is_empty());
    assert_eq!(after.modified_at, before.modified_at);
    assert!(nb.search("ghost")?.is_empty());
    Ok(())
}

#[test]
fn rebuild_search_index_recovers_entries() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Indexed")?;
    nb.append_block(note.id, "payload")?;
    nb.create_note("Other")?;

    nb.write(|scope| {
        scope.execute("DELETE FROM search_entries", [])?;
        Ok(())
    })?;
    assert!(nb.search("payload")?.is_empty());

    assert_eq!(nb.rebuild_search_index()?, 2);
    let hits = nb.search("payload")?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].note_id, note.id);
    Ok(())
}

#[test]
fn clear_archive_removes_everything() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    for title in ["one", "two"] {
        let note = nb.create_note(title)?;
        nb.append_block(note.id, "body")?;
        nb.delete_note(note.id)?;
    }
    assert_eq!(nb.list_archive_previews()?.len(), 2);

    assert_eq!(nb.clear_archive()?, 2);
    assert!(nb.list_archive_previews()?.is_empty());
    assert_eq!(nb.clear_archive()?, 0);
    Ok(())
}

#[test]
fn enforce_capacity_after_lowering_limit() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.db");
    let wide = Notebook::create(&path, NotebookConfig::default())?;
    for title in ["a", "b", "c"] {
        wide.create_note(title)?;
    }

    let narrow = Notebook::open(&path, NotebookConfig::default().with_capacity(1))?;
    assert_eq!(narrow.enforce_capacity()?.len(), 2);
    assert_eq!(narrow.list_note_previews()?.len(), 1);
    assert!(narrow.enforce_capacity()?.is_empty());
    Ok(())
}

#[test]
fn open_rejects_foreign_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("other.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE unrelated (x INTEGER);")
        .unwrap();

    let result = Notebook::open(&path, NotebookConfig::default());
    assert!(matches!(result, Err(NotesError::InvalidDatabase(_))));
}

#[test]
fn concurrent_writers_keep_order_dense() -> Result<(), NotesError> {
    let dir = TempDir::new().unwrap();
    let nb = open_notebook(&dir, NotebookConfig::default());
    let note = nb.create_note("Shared")?;

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let nb = nb.clone();
            std::thread::spawn(move || {
                for i in 0..5 {
                    nb.append_block(note.id, &format!("w{worker}-{i}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let after = nb.get_note(note.id)?;
    assert_eq!(after.blocks.len(), 20);
    assert_contiguous(&after);
    Ok(())
}
