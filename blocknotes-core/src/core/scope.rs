//! Unit-of-work scopes over a Blocknotes database.
//!
//! A [`Scope`] owns one freshly opened connection and at most one SQLite
//! transaction. It starts [`ScopeState::Idle`]; the first statement begins the
//! transaction and moves it to [`ScopeState::Open`]; [`Scope::commit`] or
//! [`Scope::rollback`] end it. Once ended, every further statement fails with
//! [`NotesError::ScopeClosed`] and both `commit` and `rollback` are no-ops.
//!
//! A statement that fails poisons the scope. A poisoned scope can only roll
//! back: `commit` undoes everything the transaction wrote and reports
//! [`NotesError::ScopePoisoned`].
//!
//! Dropping a scope that is still open rolls it back, and the connection is
//! closed with it, so every exit path releases the store.

use crate::{NotesError, Result, Storage};
use rusqlite::{Connection, OptionalExtension, Params, Row};

/// Lifecycle of a [`Scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// No statement has run yet; no transaction exists.
    Idle,
    /// A transaction is in progress.
    Open,
    /// The transaction committed (or the scope ended without touching the store).
    Committed,
    /// The transaction was rolled back.
    RolledBack,
}

/// How a scope's transaction is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// `BEGIN DEFERRED`: shared read snapshot, no write lock up front.
    Read,
    /// `BEGIN IMMEDIATE`: takes the store's write lock on the first statement,
    /// so concurrent writers are serialized by SQLite.
    Write,
}

/// A single logical unit of work. Create one per request; never share it.
pub struct Scope {
    conn: Connection,
    mode: ScopeMode,
    state: ScopeState,
    poisoned: bool,
}

impl Scope {
    /// Opens a write scope on a fresh connection.
    pub fn write(storage: &Storage) -> Result<Self> {
        Self::new(storage, ScopeMode::Write)
    }

    /// Opens a read scope on a fresh connection.
    pub fn read(storage: &Storage) -> Result<Self> {
        Self::new(storage, ScopeMode::Read)
    }

    fn new(storage: &Storage, mode: ScopeMode) -> Result<Self> {
        Ok(Self {
            conn: storage.connect()?,
            mode,
            state: ScopeState::Idle,
            poisoned: false,
        })
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub fn mode(&self) -> ScopeMode {
        self.mode
    }

    /// True once any statement in this scope has failed.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Runs `op` inside this scope, committing on success and rolling back on error.
    ///
    /// # Errors
    ///
    /// Returns the error from `op` (after rolling back), or the commit failure.
    pub fn run<T>(mut self, op: impl FnOnce(&mut Scope) -> Result<T>) -> Result<T> {
        match op(&mut self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                log::warn!("Rolling back scope after error: {e}");
                if let Err(rollback_err) = self.rollback() {
                    log::warn!("Rollback failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    /// Executes a statement and returns the number of affected rows.
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<usize> {
        self.begin_if_idle()?;
        let result = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.execute(params));
        self.track(result)
    }

    /// Executes an INSERT and returns the rowid the store assigned.
    pub fn insert<P: Params>(&mut self, sql: &str, params: P) -> Result<i64> {
        self.execute(sql, params)?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Runs a query that must return exactly one row.
    pub fn query_row<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<T>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.begin_if_idle()?;
        let result = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.query_row(params, f));
        self.track(result)
    }

    /// Runs a query returning at most one row; no row is `Ok(None)`, not an error.
    pub fn query_row_optional<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<Option<T>>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.begin_if_idle()?;
        let result = self
            .conn
            .prepare_cached(sql)
            .and_then(|mut stmt| stmt.query_row(params, f).optional());
        self.track(result)
    }

    /// Runs a query and maps every row.
    pub fn query_map<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<Vec<T>>
    where
        P: Params,
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.begin_if_idle()?;
        let result = collect_rows(&self.conn, sql, params, f);
        self.track(result)
    }

    /// Commits the transaction.
    ///
    /// Committing an idle scope just closes it. Committing a closed scope is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::ScopePoisoned`] if a statement failed earlier (the
    /// transaction is rolled back instead), or [`NotesError::Database`] if the
    /// COMMIT itself fails (the transaction is rolled back as well).
    pub fn commit(&mut self) -> Result<()> {
        match self.state {
            ScopeState::Idle => {
                self.state = ScopeState::Committed;
                Ok(())
            }
            ScopeState::Open if self.poisoned => {
                self.rollback()?;
                Err(NotesError::ScopePoisoned)
            }
            ScopeState::Open => match self.conn.execute_batch("COMMIT") {
                Ok(()) => {
                    self.state = ScopeState::Committed;
                    log::debug!("Scope committed");
                    Ok(())
                }
                Err(e) => {
                    self.poisoned = true;
                    if let Err(rollback_err) = self.rollback() {
                        log::warn!("Rollback after failed commit also failed: {rollback_err}");
                    }
                    Err(e.into())
                }
            },
            ScopeState::Committed | ScopeState::RolledBack => Ok(()),
        }
    }

    /// Rolls back the transaction. A no-op once the scope is closed.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::Database`] if SQLite rejects the ROLLBACK; the
    /// scope is closed regardless.
    pub fn rollback(&mut self) -> Result<()> {
        match self.state {
            ScopeState::Idle => {
                self.state = ScopeState::RolledBack;
                Ok(())
            }
            ScopeState::Open => {
                self.state = ScopeState::RolledBack;
                log::debug!("Scope rolled back");
                self.conn.execute_batch("ROLLBACK")?;
                Ok(())
            }
            ScopeState::Committed | ScopeState::RolledBack => Ok(()),
        }
    }

    fn begin_if_idle(&mut self) -> Result<()> {
        match self.state {
            ScopeState::Idle => {
                let begin = match self.mode {
                    ScopeMode::Read => "BEGIN DEFERRED",
                    ScopeMode::Write => "BEGIN IMMEDIATE",
                };
                self.conn.execute_batch(begin)?;
                self.state = ScopeState::Open;
                log::debug!("Scope opened ({:?})", self.mode);
                Ok(())
            }
            ScopeState::Open => Ok(()),
            ScopeState::Committed | ScopeState::RolledBack => Err(NotesError::ScopeClosed),
        }
    }

    fn track<T>(&mut self, result: rusqlite::Result<T>) -> Result<T> {
        result.map_err(|e| {
            self.poisoned = true;
            NotesError::from(e)
        })
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.state == ScopeState::Open {
            log::warn!("Scope dropped while open; rolling back");
            // Ignore errors here; the connection closes right after.
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

fn collect_rows<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> rusqlite::Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, f)?;
    rows.collect()
}
