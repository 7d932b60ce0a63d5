//! Note record model.
//!
//! # Invariants
//! - `created` never changes after insert.
//! - `modified >= created`, and every update strictly increases `modified`.

use crate::model::document::Node;
use crate::service::note_service::derive_title;
use serde::{Deserialize, Serialize};

/// Store-assigned note identifier (SQLite rowid, always positive).
pub type NoteId = i64;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Persisted note row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    /// Rich-text document tree.
    pub content: Node,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub pinned: bool,
}

impl NoteRecord {
    /// Display title derived from the first block of `content`.
    pub fn title(&self) -> String {
        derive_title(&self.content)
    }
}

/// Insert payload: a note record minus its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub content: Node,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub pinned: bool,
}

impl NewNote {
    /// Builds an unpinned note stamped with `now` for both timestamps.
    pub fn unpinned(content: Node, now: Timestamp) -> Self {
        Self {
            content,
            created: now,
            modified: now,
            pinned: false,
        }
    }
}

/// Partial store update. `modified` is always written.
#[derive(Debug, Clone, PartialEq)]
pub struct NotePatch {
    pub content: Option<Node>,
    pub pinned: Option<bool>,
    pub modified: Timestamp,
}

/// Caller-facing changes for `NoteService::update_note`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteChanges {
    pub content: Option<Node>,
    pub pinned: Option<bool>,
}

impl NoteChanges {
    pub fn content(content: Node) -> Self {
        Self {
            content: Some(content),
            pinned: None,
        }
    }

    pub fn pinned(pinned: bool) -> Self {
        Self {
            content: None,
            pinned: Some(pinned),
        }
    }
}
