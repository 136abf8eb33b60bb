//! Notebook configuration persistence.
//!
//! Stores the retention and search policy in a JSON file at an OS-appropriate
//! location. Every field has a default, so a partial or missing file is fine.

use crate::{NotesError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of active notes kept before the oldest are archived.
pub const DEFAULT_CAPACITY: usize = 20;

/// Default separator between block contents in a search entry.
pub const DEFAULT_SEARCH_DELIMITER: &str = " | ";

/// Title given to notes created without one.
pub const DEFAULT_TITLE: &str = "Untitled Note";

/// Tunable policy for a [`Notebook`](super::notebook::Notebook).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotebookConfig {
    /// Maximum number of active notes retained.
    pub capacity: usize,
    /// Joins block contents in the search mirror.
    pub search_delimiter: String,
    /// Title used by `create_note` when the caller supplies an empty one.
    pub default_title: String,
    /// How long a scope waits on the store's write lock before failing.
    pub busy_timeout_ms: u64,
    /// Characters kept on each side of a match in search snippets.
    pub snippet_radius: usize,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            search_delimiter: DEFAULT_SEARCH_DELIMITER.to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            busy_timeout_ms: 5_000,
            snippet_radius: 40,
        }
    }
}

impl NotebookConfig {
    /// Returns a copy with `capacity` replaced.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks that the policy is usable.
    ///
    /// # Errors
    ///
    /// Returns [`NotesError::ValidationFailed`] if `capacity` is zero or
    /// `default_title` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(NotesError::ValidationFailed(
                "Capacity must be at least 1".to_string(),
            ));
        }
        if self.default_title.is_empty() {
            return Err(NotesError::ValidationFailed(
                "Default title cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the path to the configuration JSON file.
///
/// - macOS / Linux: `~/.config/blocknotes/config.json`
/// - Windows: `%APPDATA%/Blocknotes/config.json`
pub fn config_file_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("Blocknotes").join("config.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("blocknotes").join("config.json")
    }
}

/// Loads configuration from `path`; returns defaults if the file is missing or corrupt.
pub fn load_config<P: AsRef<Path>>(path: P) -> NotebookConfig {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config at {}: {e}", path.display());
            NotebookConfig::default()
        }),
        Err(_) => NotebookConfig::default(),
    }
}

/// Saves configuration to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`NotesError::Io`] if the directory or file cannot be written, or
/// [`NotesError::Json`] if serialization fails.
pub fn save_config<P: AsRef<Path>>(path: P, config: &NotebookConfig) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)?;
    Ok(())
}
