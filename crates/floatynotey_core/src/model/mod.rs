//! Domain model for persisted notes.
//!
//! # Responsibility
//! - Define the note record shape shared by store, service and session.
//! - Define the generic document tree that note content is stored as.
//!
//! # Invariants
//! - Every note is identified by a store-assigned `NoteId` that is never reused.
//! - Content is opaque to everything except title derivation.

pub mod document;
pub mod note;
