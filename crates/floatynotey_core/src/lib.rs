//! Core domain logic for FloatyNotey.
//! This crate is the single source of truth for note invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod deep_link;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use deep_link::DeepLinkCodec;
pub use logging::{default_log_level, init_logging, logging_status};
pub use migrate::{migrate_if_needed, MigrationError, MigrationOutcome};
pub use model::document::{Mark, Node};
pub use model::note::{NoteChanges, NoteId, NoteRecord, Timestamp};
pub use repo::note_store::{NoteStore, SqliteNoteStore, StoreError, StoreResult};
pub use repo::settings_store::{SettingsStore, SqliteSettingsStore};
pub use service::note_service::{derive_title, NoteService, UNTITLED};
pub use session::debounce::{ManualScheduler, Scheduler, TaskHandle};
pub use session::history::NavigationHistory;
pub use session::{NoteSession, SessionError, SessionOptions, SessionResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
