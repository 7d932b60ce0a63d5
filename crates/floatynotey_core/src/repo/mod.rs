//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define the note store and settings store contracts.
//! - Isolate SQLite query details from service/session orchestration.
//!
//! # Invariants
//! - Update/delete of a missing note id returns `StoreError::NotFound`,
//!   never a silent no-op.
//! - Content is persisted as JSON text and never interpreted here.

pub mod note_store;
pub mod settings_store;
