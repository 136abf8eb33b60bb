use crate::{NotebookConfig, NotesError, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const REQUIRED_TABLES: [&str; 5] = [
    "notes",
    "blocks",
    "notes_archive",
    "blocks_archive",
    "search_entries",
];

/// Location of a Blocknotes database plus the settings every connection to it gets.
///
/// `Storage` never holds a live connection; each scope opens its own through
/// [`Storage::connect`] and closes it when the scope is dropped.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Storage {
    pub fn create<P: AsRef<Path>>(path: P, config: &NotebookConfig) -> Result<Self> {
        let storage = Self::at(path, config);
        let conn = storage.connect()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        log::debug!("Initialised schema at {}", storage.path.display());
        Ok(storage)
    }

    pub fn open<P: AsRef<Path>>(path: P, config: &NotebookConfig) -> Result<Self> {
        let storage = Self::at(path, config);
        let conn = storage.connect()?;

        let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
        let table_count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ({placeholders})"
            ),
            rusqlite::params_from_iter(REQUIRED_TABLES.iter()),
            |row| row.get(0),
        )?;

        if table_count != REQUIRED_TABLES.len() as i64 {
            return Err(NotesError::InvalidDatabase(
                "Not a valid Blocknotes database".to_string(),
            ));
        }

        Ok(storage)
    }

    /// Opens a fresh connection with the pragmas every scope relies on.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let _mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        let _limit: i64 =
            conn.pragma_update_and_check(None, "journal_size_limit", 6_144_000, |row| row.get(0))?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn at<P: AsRef<Path>>(path: P, config: &NotebookConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        }
    }
}
