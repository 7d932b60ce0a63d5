//! One-shot import of the legacy single-document format.
//!
//! # Responsibility
//! - Move the pre-store markup document into the note store exactly once.
//! - Record completion in the settings store so later runs are no-ops.
//!
//! # Invariants
//! - The migrated flag is the only gate; once written, nothing is imported again.
//! - Existing notes always win: a non-empty store is never merged with legacy data.
//! - The legacy key is read, never deleted.
//! - Any legacy string is importable: broken markup is read leniently.
//! - The flag is written only after the import note exists, so a storage
//!   failure before that point is retried on the next run.

pub mod markup;

use crate::clock::Clock;
use crate::model::note::{NewNote, NoteId};
use crate::repo::note_store::{NoteStore, StoreError};
use crate::repo::settings_store::{SettingsStore, LEGACY_CONTENT_KEY, MIGRATED_KEY};
use log::{info, warn};
use markup::parse_markup;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MIGRATED_VALUE: &str = "1";

/// What a migration run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No settings storage to read legacy content from.
    StorageUnavailable,
    /// Flag was already set by an earlier run.
    AlreadyMigrated,
    /// No legacy content existed; flag set.
    NothingToImport,
    /// Store already held notes; flag set without importing.
    SkippedExistingNotes,
    /// Legacy content imported as the given note.
    Imported(NoteId),
}

impl MigrationOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::StorageUnavailable => "storage_unavailable",
            Self::AlreadyMigrated => "already_migrated",
            Self::NothingToImport => "nothing_to_import",
            Self::SkippedExistingNotes => "skipped_existing_notes",
            Self::Imported(_) => "imported",
        }
    }
}

#[derive(Debug)]
pub enum MigrationError {
    /// Reading or writing the note/settings stores failed.
    Store(StoreError),
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

// Display forwards the wrapped error, so the chain continues below it.
impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => err.source(),
        }
    }
}

impl From<StoreError> for MigrationError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Imports legacy content into `notes` if it has not been done yet.
///
/// `settings` is `None` when the host has no key/value storage at all; that
/// is treated as having no legacy content and nothing is written.
pub fn migrate_if_needed<N, S>(
    notes: &N,
    settings: Option<&S>,
    clock: &dyn Clock,
) -> Result<MigrationOutcome, MigrationError>
where
    N: NoteStore + ?Sized,
    S: SettingsStore + ?Sized,
{
    let outcome = run(notes, settings, clock);
    match &outcome {
        Ok(result) => match result {
            MigrationOutcome::Imported(id) => info!(
                "event=legacy_migration module=migrate status=ok outcome={} note_id={id}",
                result.as_str()
            ),
            other => info!(
                "event=legacy_migration module=migrate status=ok outcome={}",
                other.as_str()
            ),
        },
        Err(err) => warn!("event=legacy_migration module=migrate status=error error={err}"),
    }
    outcome
}

fn run<N, S>(
    notes: &N,
    settings: Option<&S>,
    clock: &dyn Clock,
) -> Result<MigrationOutcome, MigrationError>
where
    N: NoteStore + ?Sized,
    S: SettingsStore + ?Sized,
{
    let Some(settings) = settings else {
        return Ok(MigrationOutcome::StorageUnavailable);
    };

    if settings.get(MIGRATED_KEY)?.is_some_and(|flag| !flag.is_empty()) {
        return Ok(MigrationOutcome::AlreadyMigrated);
    }

    let legacy = settings
        .get(LEGACY_CONTENT_KEY)?
        .filter(|markup| !markup.is_empty());
    let Some(legacy) = legacy else {
        settings.set(MIGRATED_KEY, MIGRATED_VALUE)?;
        return Ok(MigrationOutcome::NothingToImport);
    };

    if notes.count()? > 0 {
        settings.set(MIGRATED_KEY, MIGRATED_VALUE)?;
        return Ok(MigrationOutcome::SkippedExistingNotes);
    }

    let document = parse_markup(&legacy);
    let id = notes.add(&NewNote::unpinned(document, clock.now_ms()))?;
    settings.set(MIGRATED_KEY, MIGRATED_VALUE)?;
    Ok(MigrationOutcome::Imported(id))
}
