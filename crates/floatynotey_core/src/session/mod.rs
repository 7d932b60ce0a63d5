//! Session controller driven by UI events.
//!
//! # Responsibility
//! - Resolve the initial note at startup (deep link, last opened, newest, new).
//! - Switch notes with flush-before-switch and back/forward history.
//! - Route new/delete/pin/search/link requests to the note service.
//!
//! # Invariants
//! - A pending debounced edit is persisted before any other note is loaded.
//! - History never holds ids of notes deleted through this session.
//! - Every switch records the last opened note id.
//! - Back/forward leave history untouched when the target cannot be loaded.

pub mod debounce;
pub mod history;

use crate::config::CoreConfig;
use crate::deep_link::DeepLinkCodec;
use crate::migrate::{migrate_if_needed, MigrationError, MigrationOutcome};
use crate::model::document::Node;
use crate::model::note::{NoteChanges, NoteId, NoteRecord};
use crate::repo::note_store::{NoteStore, StoreError};
use crate::repo::settings_store::SettingsStore;
use crate::service::note_service::NoteService;
use debounce::{PendingSave, SaveDebouncer, Scheduler, TaskHandle};
use history::NavigationHistory;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug)]
pub enum SessionError {
    Store(StoreError),
    /// An operation needing a current note ran before `start`.
    NoActiveNote,
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NoActiveNote => write!(f, "no note is open in this session"),
        }
    }
}

// `Store` displays the wrapped error itself, so its source is skipped.
impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => err.source(),
            Self::NoActiveNote => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<MigrationError> for SessionError {
    fn from(value: MigrationError) -> Self {
        match value {
            MigrationError::Store(err) => Self::Store(err),
        }
    }
}

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Quiet period before a content edit is written.
    pub save_debounce: Duration,
    pub links: DeepLinkCodec,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(crate::config::DEFAULT_SAVE_DEBOUNCE_MS),
            links: DeepLinkCodec::default(),
        }
    }
}

impl SessionOptions {
    /// Derives options from configuration; an unparsable origin falls back
    /// to the default one.
    pub fn from_config(config: &CoreConfig) -> Self {
        let links = DeepLinkCodec::new(&config.app_origin).unwrap_or_else(|err| {
            warn!(
                "event=session_config module=session status=fallback reason=invalid_origin error={err}"
            );
            DeepLinkCodec::default()
        });
        Self {
            save_debounce: Duration::from_millis(config.save_debounce_ms),
            links,
        }
    }
}

/// One running UI session over a note store.
pub struct NoteSession<R: NoteStore, K: SettingsStore, S: Scheduler> {
    notes: NoteService<R>,
    settings: K,
    history: NavigationHistory,
    saves: SaveDebouncer<S>,
    links: DeepLinkCodec,
    current: Option<NoteId>,
}

impl<R: NoteStore, K: SettingsStore, S: Scheduler> NoteSession<R, K, S> {
    pub fn new(notes: NoteService<R>, settings: K, scheduler: S, options: SessionOptions) -> Self {
        Self {
            notes,
            settings,
            history: NavigationHistory::new(),
            saves: SaveDebouncer::new(scheduler, options.save_debounce),
            links: options.links,
            current: None,
        }
    }

    pub fn notes(&self) -> &NoteService<R> {
        &self.notes
    }

    pub fn settings(&self) -> &K {
        &self.settings
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        self.saves.scheduler_mut()
    }

    pub fn current_note_id(&self) -> Option<NoteId> {
        self.current
    }

    pub fn current_note(&self) -> SessionResult<Option<NoteRecord>> {
        match self.current {
            Some(id) => Ok(self.notes.get_note(id)?),
            None => Ok(None),
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.saves.has_pending()
    }

    /// Runs legacy migration and opens the initial note.
    ///
    /// Resolution order: note named by `fragment`, last opened note, first
    /// listed note, a new empty note. Legacy content is imported before the
    /// store is inspected, so an empty-store placeholder never blocks it.
    pub fn start(&mut self, fragment: Option<&str>) -> SessionResult<NoteRecord> {
        self.run_migration()?;

        let linked = fragment.and_then(DeepLinkCodec::decode_fragment);
        let remembered = self.settings.last_note_id()?;
        let mut source = "new";
        let mut initial = None;
        for (candidate, label) in [(linked, "deep_link"), (remembered, "last_opened")] {
            if let Some(id) = candidate {
                if let Some(note) = self.notes.get_note(id)? {
                    initial = Some(note);
                    source = label;
                    break;
                }
            }
        }
        if initial.is_none() {
            if let Some(first) = self.notes.list_notes()?.into_iter().next() {
                initial = Some(first);
                source = "first_listed";
            }
        }
        let note = match initial {
            Some(note) => note,
            None => self.load(self.notes.create_note(None)?)?,
        };

        self.history.clear();
        self.make_current(note.id)?;
        info!(
            "event=session_start module=session status=ok note_id={} source={source}",
            note.id
        );
        Ok(note)
    }

    /// Runs the one-shot legacy import against this session's stores.
    pub fn run_migration(&self) -> Result<MigrationOutcome, MigrationError> {
        migrate_if_needed(
            self.notes.store(),
            Some(&self.settings),
            self.notes.clock().as_ref(),
        )
    }

    /// Records an editor change for the current note; written after the
    /// quiet period or on the next switch.
    pub fn document_changed(&mut self, document: Node) -> SessionResult<()> {
        let id = self.current.ok_or(SessionError::NoActiveNote)?;
        if let Some(displaced) = self.saves.record(id, document) {
            self.persist(displaced)?;
        }
        Ok(())
    }

    /// Handles a fired debounce timer.
    pub fn on_timer(&mut self, handle: TaskHandle) -> SessionResult<bool> {
        match self.saves.fire(handle) {
            Some(save) => {
                self.persist(save)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes the pending edit now, if there is one.
    pub fn flush(&mut self) -> SessionResult<bool> {
        match self.saves.take_pending() {
            Some(save) => {
                self.persist(save)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switches to `id`, remembering the current note for `go_back`.
    pub fn open_note(&mut self, id: NoteId) -> SessionResult<NoteRecord> {
        self.flush()?;
        let note = self.load(id)?;
        if self.current != Some(id) {
            if let Some(previous) = self.current {
                self.history.push(previous);
            }
            self.make_current(id)?;
        }
        Ok(note)
    }

    /// Creates an empty note and switches to it.
    pub fn new_note(&mut self) -> SessionResult<NoteRecord> {
        self.flush()?;
        let id = self.notes.create_note(None)?;
        let note = self.load(id)?;
        if let Some(previous) = self.current {
            self.history.push(previous);
        }
        self.make_current(id)?;
        Ok(note)
    }

    /// Deletes `id`. When it was the open note, switches to the first listed
    /// note (or a fresh one) and returns that note.
    pub fn delete_note(&mut self, id: NoteId) -> SessionResult<Option<NoteRecord>> {
        if self.saves.discard(id) {
            debug!("event=save_discard module=session status=ok note_id={id}");
        }
        self.flush()?;
        self.notes.delete_note(id)?;
        self.history.forget(id);

        if self.current != Some(id) {
            return Ok(None);
        }

        let next = match self.notes.list_notes()?.into_iter().next() {
            Some(note) => note,
            None => self.load(self.notes.create_note(None)?)?,
        };
        self.make_current(next.id)?;
        Ok(Some(next))
    }

    /// Flips the pinned flag and returns the new value.
    pub fn toggle_pin(&mut self, id: NoteId) -> SessionResult<bool> {
        let note = self.load(id)?;
        let pinned = !note.pinned;
        self.notes.update_note(id, NoteChanges::pinned(pinned))?;
        Ok(pinned)
    }

    pub fn go_back(&mut self) -> SessionResult<Option<NoteRecord>> {
        let current = self.current.ok_or(SessionError::NoActiveNote)?;
        self.flush()?;
        let Some(target) = self.history.peek_back() else {
            return Ok(None);
        };
        let note = self.load(target)?;
        self.history.go_back(current);
        self.make_current(target)?;
        Ok(Some(note))
    }

    pub fn go_forward(&mut self) -> SessionResult<Option<NoteRecord>> {
        let current = self.current.ok_or(SessionError::NoActiveNote)?;
        self.flush()?;
        let Some(target) = self.history.peek_forward() else {
            return Ok(None);
        };
        let note = self.load(target)?;
        self.history.go_forward(current);
        self.make_current(target)?;
        Ok(Some(note))
    }

    pub fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    pub fn list_notes(&self) -> SessionResult<Vec<NoteRecord>> {
        Ok(self.notes.list_notes()?)
    }

    pub fn search_notes(&self, query: &str) -> SessionResult<Vec<NoteRecord>> {
        Ok(self.notes.search_notes(query)?)
    }

    /// Shareable link to the open note.
    pub fn share_link(&self) -> Option<String> {
        self.current.map(|id| self.links.encode(id))
    }

    /// Follows a link clicked inside a note. Returns `None` for links that do
    /// not point at a note of this application.
    pub fn open_link(&mut self, url: &str) -> SessionResult<Option<NoteRecord>> {
        match self.links.decode_url(url) {
            Some(id) => self.open_note(id).map(Some),
            None => Ok(None),
        }
    }

    fn load(&self, id: NoteId) -> SessionResult<NoteRecord> {
        self.notes
            .get_note(id)?
            .ok_or(SessionError::Store(StoreError::NotFound(id)))
    }

    fn make_current(&mut self, id: NoteId) -> SessionResult<()> {
        self.current = Some(id);
        self.settings.set_last_note_id(id)?;
        debug!("event=note_switch module=session status=ok note_id={id}");
        Ok(())
    }

    fn persist(&self, save: PendingSave) -> SessionResult<()> {
        let note_id = save.note_id;
        match self
            .notes
            .update_note(note_id, NoteChanges::content(save.document))
        {
            Ok(()) => {
                debug!("event=save_flush module=session status=ok note_id={note_id}");
                Ok(())
            }
            // Deleted elsewhere between edit and flush; nothing to keep.
            Err(StoreError::NotFound(_)) => {
                warn!("event=save_flush module=session status=skipped reason=not_found note_id={note_id}");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
