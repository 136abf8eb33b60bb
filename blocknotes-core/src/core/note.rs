//! Note, block, archive and search record types.
//!
//! All types serialize in camelCase so they can be handed straight to a
//! rendering layer.

use serde::{Deserialize, Serialize};

/// One ordered unit of content inside a [`Note`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: i64,
    pub note_id: i64,
    /// Zero-based, contiguous rank within the owning note.
    pub sort_order: i64,
    pub content: String,
}

/// An active note together with its blocks in `sort_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub title: String,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
    /// Unix timestamp in milliseconds; never decreases.
    pub modified_at: i64,
    pub blocks: Vec<Block>,
}

impl Note {
    pub fn block_contents(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.content.as_str()).collect()
    }
}

/// Entry in the active note list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePreview {
    pub id: i64,
    pub title: String,
}

/// A block copied into the archive, with its order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedBlock {
    pub id: i64,
    /// ID of the owning [`ArchivedNote`].
    pub note_id: i64,
    pub sort_order: i64,
    pub content: String,
}

/// A note evicted by the retention policy or deleted by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedNote {
    pub id: i64,
    pub title: String,
    pub created_at: i64,
    pub modified_at: i64,
    pub archived_at: i64,
    pub blocks: Vec<ArchivedBlock>,
}

/// Entry in the archive list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePreview {
    pub id: i64,
    pub title: String,
    pub block_count: i64,
}

/// A note matched by [`Notebook::search`](super::notebook::Notebook::search).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub note_id: i64,
    pub title: String,
    /// Full search content: every block joined by the configured delimiter.
    pub content: String,
    /// Excerpt of `content` around the first match.
    pub snippet: String,
}
