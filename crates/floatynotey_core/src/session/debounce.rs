//! Debounced content saves.
//!
//! # Responsibility
//! - Coalesce rapid edits of one note into a single pending write.
//! - Keep timer plumbing behind a small `Scheduler` interface so no runtime
//!   or event loop is assumed.
//!
//! # Invariants
//! - At most one pending write and one live timer exist at a time.
//! - A superseded timer is cancelled before a new one is scheduled.
//! - A fired handle that is no longer current flushes nothing.

use crate::model::document::Node;
use crate::model::note::NoteId;
use std::time::Duration;

/// Identifies one scheduled flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Timer source for debounced flushes.
///
/// The work to run is not passed in: when a timer fires, the host hands the
/// returned handle back to `NoteSession::on_timer`, which performs the flush.
pub trait Scheduler {
    fn schedule(&mut self, delay: Duration) -> TaskHandle;
    fn cancel(&mut self, handle: TaskHandle);
}

/// Scheduler over virtual time, advanced explicitly by the host or a test.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_handle: u64,
    timers: Vec<(Duration, TaskHandle)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward and returns the handles that came due,
    /// earliest deadline first.
    pub fn advance(&mut self, by: Duration) -> Vec<TaskHandle> {
        self.now += by;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .timers
            .drain(..)
            .partition(|(deadline, _)| *deadline <= now);
        self.timers = pending;
        due.sort();
        due.into_iter().map(|(_, handle)| handle).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TaskHandle {
        self.next_handle += 1;
        let handle = TaskHandle(self.next_handle);
        self.timers.push((self.now + delay, handle));
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.timers.retain(|(_, scheduled)| *scheduled != handle);
    }
}

/// Write waiting for its quiet period to elapse.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub note_id: NoteId,
    pub document: Node,
}

#[derive(Debug)]
struct Pending {
    save: PendingSave,
    handle: TaskHandle,
}

/// Coalesces edits into one pending save per quiet period.
#[derive(Debug)]
pub struct SaveDebouncer<S: Scheduler> {
    scheduler: S,
    delay: Duration,
    pending: Option<Pending>,
}

impl<S: Scheduler> SaveDebouncer<S> {
    pub fn new(scheduler: S, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            pending: None,
        }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_note(&self) -> Option<NoteId> {
        self.pending.as_ref().map(|pending| pending.save.note_id)
    }

    /// Replaces the pending write with `document` and restarts the quiet
    /// period.
    ///
    /// Returns the displaced write when it belonged to a different note; the
    /// caller must persist it right away.
    pub fn record(&mut self, note_id: NoteId, document: Node) -> Option<PendingSave> {
        let displaced = self.pending.take().and_then(|previous| {
            self.scheduler.cancel(previous.handle);
            (previous.save.note_id != note_id).then_some(previous.save)
        });

        let handle = self.scheduler.schedule(self.delay);
        self.pending = Some(Pending {
            save: PendingSave { note_id, document },
            handle,
        });
        displaced
    }

    /// Cancels the timer and hands back the pending write, if any.
    pub fn take_pending(&mut self) -> Option<PendingSave> {
        let pending = self.pending.take()?;
        self.scheduler.cancel(pending.handle);
        Some(pending.save)
    }

    /// Returns the pending write when `handle` is the live timer.
    pub fn fire(&mut self, handle: TaskHandle) -> Option<PendingSave> {
        if self.pending.as_ref()?.handle != handle {
            return None;
        }
        self.pending.take().map(|pending| pending.save)
    }

    /// Drops a pending write for `note_id` (the note was deleted).
    pub fn discard(&mut self, note_id: NoteId) -> bool {
        if self.pending_note() != Some(note_id) {
            return false;
        }
        self.take_pending().is_some()
    }
}
