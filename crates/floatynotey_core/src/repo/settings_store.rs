//! Scalar key/value settings kept outside the notes table.
//!
//! # Responsibility
//! - Persist small string flags (last opened note, migration marker).
//! - Expose the legacy single-document key to the migration path.

use crate::model::note::NoteId;
use crate::repo::note_store::{table_exists, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Pre-migration single document, stored as editor markup.
pub const LEGACY_CONTENT_KEY: &str = "floatynotey:content";
/// Set to `"1"` once legacy migration has run to completion.
pub const MIGRATED_KEY: &str = "floatynotey:migrated";
/// Decimal id of the note that was open most recently.
pub const LAST_NOTE_ID_KEY: &str = "floatynotey:lastNoteId";

/// Simple string key/value storage.
pub trait SettingsStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// Reads the last opened note id; unparsable values read as absent.
    fn last_note_id(&self) -> StoreResult<Option<NoteId>> {
        Ok(self
            .get(LAST_NOTE_ID_KEY)?
            .and_then(|value| value.trim().parse::<NoteId>().ok())
            .filter(|id| *id > 0))
    }

    fn set_last_note_id(&self, id: NoteId) -> StoreResult<()> {
        self.set(LAST_NOTE_ID_KEY, &id.to_string())
    }
}

/// SQLite-backed settings over the `settings` table.
pub struct SqliteSettingsStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsStore<'conn> {
    /// Constructs a settings store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        if !table_exists(conn, "settings")? {
            return Err(StoreError::MissingRequiredTable("settings"));
        }
        Ok(Self { conn })
    }
}

impl SettingsStore for SqliteSettingsStore<'_> {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1;", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1;", [key])?;
        Ok(())
    }
}
