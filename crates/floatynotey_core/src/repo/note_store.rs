//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD over the `notes` table.
//! - Serve the `modified DESC` ordering used by note listing.
//!
//! # Invariants
//! - Ids come from `AUTOINCREMENT` and are never reassigned.
//! - Every update strictly increases `modified`, even if the caller's clock
//!   stalls or moves backwards.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::model::document::Node;
use crate::model::note::{NewNote, NoteId, NotePatch, NoteRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    content,
    created,
    modified,
    pinned
FROM notes";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for note/settings persistence operations.
#[derive(Debug)]
pub enum StoreError {
    /// Operation addressed a note id that does not exist.
    NotFound(NoteId),
    /// Underlying SQLite I/O failure (disk full, corruption, ...).
    StorageFailure(DbError),
    /// Connection was not bootstrapped through `db::open_db*`.
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::StorageFailure(err) => write!(f, "storage failure: {err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "note store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
        }
    }
}

// Variants that print the wrapped error skip it in the source chain.
impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageFailure(err) => err.source(),
            Self::NotFound(_) | Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::StorageFailure(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(DbError::Sqlite(value))
    }
}

/// Durable keyed storage of note records.
pub trait NoteStore {
    /// Inserts a record and returns its newly assigned id.
    fn add(&self, note: &NewNote) -> StoreResult<NoteId>;
    fn get(&self, id: NoteId) -> StoreResult<Option<NoteRecord>>;
    /// Applies the provided fields and stamps `modified`.
    fn update(&self, id: NoteId, patch: &NotePatch) -> StoreResult<()>;
    fn delete(&self, id: NoteId) -> StoreResult<()>;
    fn count(&self) -> StoreResult<u64>;
    /// All records in store-native order (ascending id).
    fn list_all(&self) -> StoreResult<Vec<NoteRecord>>;
    /// All records, newest `modified` first; ties by id descending.
    fn list_by_modified_desc(&self) -> StoreResult<Vec<NoteRecord>>;
}

/// SQLite-backed note store.
pub struct SqliteNoteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        if !table_exists(conn, "notes")? {
            return Err(StoreError::MissingRequiredTable("notes"));
        }
        Ok(Self { conn })
    }

    fn query_notes(&self, sql: &str) -> StoreResult<Vec<NoteRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(parse_note_row(row)?);
        }
        Ok(notes)
    }
}

impl NoteStore for SqliteNoteStore<'_> {
    fn add(&self, note: &NewNote) -> StoreResult<NoteId> {
        let content = encode_content(&note.content)?;
        self.conn.execute(
            "INSERT INTO notes (content, created, modified, pinned)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                content,
                note.created,
                note.modified.max(note.created),
                bool_to_int(note.pinned),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: NoteId) -> StoreResult<Option<NoteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let row = stmt
            .query_row([id], |row| Ok(parse_note_row(row)))
            .optional()?;
        row.transpose()
    }

    fn update(&self, id: NoteId, patch: &NotePatch) -> StoreResult<()> {
        let content = patch.content.as_ref().map(encode_content).transpose()?;
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                content = COALESCE(?2, content),
                pinned = COALESCE(?3, pinned),
                modified = MAX(?4, modified + 1)
             WHERE id = ?1;",
            params![id, content, patch.pinned.map(bool_to_int), patch.modified],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }

    fn delete(&self, id: NoteId) -> StoreResult<()> {
        let changed = self.conn.execute("DELETE FROM notes WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative note count `{count}`")))
    }

    fn list_all(&self) -> StoreResult<Vec<NoteRecord>> {
        self.query_notes(&format!("{NOTE_SELECT_SQL} ORDER BY id ASC;"))
    }

    fn list_by_modified_desc(&self) -> StoreResult<Vec<NoteRecord>> {
        self.query_notes(&format!(
            "{NOTE_SELECT_SQL} ORDER BY modified DESC, id DESC;"
        ))
    }
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<NoteRecord> {
    let id: NoteId = row.get("id")?;
    let content_text: String = row.get("content")?;
    let content = Node::from_json_str(&content_text).map_err(|err| {
        StoreError::InvalidData(format!("note {id} has undecodable content: {err}"))
    })?;

    let pinned = match row.get::<_, i64>("pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid pinned value `{other}` in notes.pinned"
            )));
        }
    };

    Ok(NoteRecord {
        id,
        content,
        created: row.get("created")?,
        modified: row.get("modified")?,
        pinned,
    })
}

fn encode_content(content: &Node) -> StoreResult<String> {
    content
        .to_json_string()
        .map_err(|err| StoreError::InvalidData(format!("content cannot be encoded: {err}")))
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
