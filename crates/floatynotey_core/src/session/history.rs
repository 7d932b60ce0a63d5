//! Back/forward navigation over note ids.
//!
//! # Invariants
//! - Session scoped: owned by one `NoteSession`, never persisted.
//! - A fresh `push` invalidates the whole forward path.

use crate::model::note::NoteId;

/// Linear undo/redo pair of stacks, the classic browser-history model.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NavigationHistory {
    back: Vec<NoteId>,
    forward: Vec<NoteId>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the note being navigated away from.
    pub fn push(&mut self, id: NoteId) {
        self.back.push(id);
        self.forward.clear();
    }

    /// Steps back from `current`, returning the note to show.
    pub fn go_back(&mut self, current: NoteId) -> Option<NoteId> {
        let target = self.back.pop()?;
        self.forward.push(current);
        Some(target)
    }

    /// Steps forward from `current`, returning the note to show.
    pub fn go_forward(&mut self, current: NoteId) -> Option<NoteId> {
        let target = self.forward.pop()?;
        self.back.push(current);
        Some(target)
    }

    /// Note `go_back` would return, without moving.
    pub fn peek_back(&self) -> Option<NoteId> {
        self.back.last().copied()
    }

    pub fn peek_forward(&self) -> Option<NoteId> {
        self.forward.last().copied()
    }

    pub fn can_go_back(&self) -> bool {
        !self.back.is_empty()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.forward.is_empty()
    }

    /// Drops every entry for a deleted note from both stacks.
    pub fn forget(&mut self, id: NoteId) {
        self.back.retain(|entry| *entry != id);
        self.forward.retain(|entry| *entry != id);
    }

    pub fn clear(&mut self) {
        self.back.clear();
        self.forward.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::NavigationHistory;

    #[test]
    fn back_then_forward_round_trips() {
        let mut history = NavigationHistory::new();
        history.push(5);
        assert_eq!(history.go_back(7), Some(5));
        assert!(history.can_go_forward());
        assert_eq!(history.go_forward(5), Some(7));
        assert!(history.can_go_back());
        assert!(!history.can_go_forward());
    }

    #[test]
    fn peek_matches_the_next_step_and_does_not_move() {
        let mut history = NavigationHistory::new();
        assert_eq!(history.peek_back(), None);
        history.push(1);
        history.push(2);

        assert_eq!(history.peek_back(), Some(2));
        assert_eq!(history.peek_back(), Some(2));
        assert_eq!(history.peek_forward(), None);
        assert_eq!(history.go_back(3), Some(2));
        assert_eq!(history.peek_forward(), Some(3));
        assert_eq!(history.peek_back(), Some(1));
    }

    #[test]
    fn empty_stacks_return_none_without_side_effects() {
        let mut history = NavigationHistory::new();
        assert_eq!(history.go_back(1), None);
        assert_eq!(history.go_forward(1), None);
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
        assert_eq!(history, NavigationHistory::new());
    }

    #[test]
    fn push_clears_forward_path() {
        let mut history = NavigationHistory::new();
        history.push(1);
        history.push(2);
        assert_eq!(history.go_back(3), Some(2));
        assert!(history.can_go_forward());

        history.push(2);
        assert!(!history.can_go_forward());
        assert_eq!(history.go_back(4), Some(2));
        assert_eq!(history.go_back(2), Some(1));
        assert_eq!(history.go_back(1), None);
    }

    #[test]
    fn forget_removes_all_occurrences() {
        let mut history = NavigationHistory::new();
        history.push(1);
        history.push(2);
        history.push(1);
        assert_eq!(history.go_back(3), Some(1));

        history.forget(1);
        assert_eq!(history.go_back(1), Some(2));
        assert_eq!(history.go_back(2), None);

        history.forget(3);
        history.forget(1);
        assert!(!history.can_go_forward());
    }
}
