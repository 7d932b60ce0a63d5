//! Note use-case service.
//!
//! # Responsibility
//! - Apply creation defaults and timestamp rules on top of the note store.
//! - Derive display titles from document content.
//! - Order and filter notes for list/search views.
//!
//! # Invariants
//! - Every update refreshes `modified`, even when nothing else changes.
//! - Listing is pinned-first, then `modified DESC`, then id descending.
//! - Title derivation is total and never fails.

use crate::clock::{Clock, SystemClock};
use crate::model::document::Node;
use crate::model::note::{NewNote, NoteChanges, NoteId, NotePatch, NoteRecord};
use crate::repo::note_store::{NoteStore, StoreResult};
use log::{debug, info};
use std::sync::Arc;

/// Title shown for notes whose first block has no text.
pub const UNTITLED: &str = "Untitled";

/// Note service facade over a store implementation.
pub struct NoteService<R: NoteStore> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: NoteStore> NoteService<R> {
    /// Creates a service stamping times from the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    /// Creates a service with an explicit time source.
    pub fn with_clock(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Underlying store, for callers that need raw access (migration).
    pub fn store(&self) -> &R {
        &self.repo
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Creates an unpinned note; `None` content means the empty document.
    pub fn create_note(&self, content: Option<Node>) -> StoreResult<NoteId> {
        let content = content.unwrap_or_else(Node::empty_document);
        let id = self
            .repo
            .add(&NewNote::unpinned(content, self.clock.now_ms()))?;
        info!("event=note_create module=service status=ok note_id={id}");
        Ok(id)
    }

    pub fn get_note(&self, id: NoteId) -> StoreResult<Option<NoteRecord>> {
        self.repo.get(id)
    }

    /// Applies the provided fields and bumps `modified`.
    pub fn update_note(&self, id: NoteId, changes: NoteChanges) -> StoreResult<()> {
        debug!(
            "event=note_update module=service status=start note_id={id} content={} pinned={:?}",
            changes.content.is_some(),
            changes.pinned
        );
        let patch = NotePatch {
            content: changes.content,
            pinned: changes.pinned,
            modified: self.clock.now_ms(),
        };
        self.repo.update(id, &patch)
    }

    pub fn delete_note(&self, id: NoteId) -> StoreResult<()> {
        self.repo.delete(id)?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    pub fn note_count(&self) -> StoreResult<u64> {
        self.repo.count()
    }

    /// Lists every note: pinned first, newest first within each group.
    pub fn list_notes(&self) -> StoreResult<Vec<NoteRecord>> {
        let mut notes = self.repo.list_by_modified_desc()?;
        // Stable sort keeps the store's modified/id ordering inside each group.
        notes.sort_by_key(|note| !note.pinned);
        Ok(notes)
    }

    /// Lists notes whose derived title contains `query`, ignoring case.
    pub fn search_notes(&self, query: &str) -> StoreResult<Vec<NoteRecord>> {
        let notes = self.list_notes()?;
        if query.is_empty() {
            return Ok(notes);
        }
        let needle = query.to_lowercase();
        Ok(notes
            .into_iter()
            .filter(|note| derive_title(&note.content).to_lowercase().contains(&needle))
            .collect())
    }
}

/// Derives a display title from the first block of `content`.
///
/// Rules:
/// - `text` of the first block's direct children, concatenated in order;
/// - surrounding whitespace trimmed;
/// - [`UNTITLED`] when that is empty or there is no block at all.
///
/// A first block that only nests other blocks (a list, a quote) is untitled.
pub fn derive_title(content: &Node) -> String {
    let text = content
        .content
        .first()
        .map(Node::inline_text)
        .unwrap_or_default();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}
