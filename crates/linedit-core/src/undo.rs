//! Bounded undo/redo log over buffer snapshots.
//!
//! A snapshot is pushed *before* a mutating action. Consecutive actions of
//! the same run kind at adjacent positions coalesce into one undo unit, so
//! typing a word undoes in one step. Any fresh mutation clears the redo
//! stack.

use std::collections::VecDeque;

/// Default number of retained undo units; the oldest is dropped first.
pub const DEFAULT_UNDO_CAP: usize = 50;

/// Buffer state captured for undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub cursor: usize,
}

/// How a mutating action coalesces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Insertion of a single code point at the cursor; merges with a
    /// preceding insertion that ended where this one starts.
    InsertRun,
    /// Deletion of a single code point; merges likewise.
    DeleteRun,
    /// Everything else; always its own unit.
    Structural,
}

#[derive(Debug)]
pub struct UndoLog {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    last_kind: Option<EditKind>,
    run_end: Option<usize>,
    cap: usize,
}

impl UndoLog {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_UNDO_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            last_kind: None,
            run_end: None,
            cap: cap.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Record that a mutation of `kind` is about to happen to `current`.
    /// Coalesces when the kind continues the active run at the position the
    /// previous edit left the cursor.
    pub fn record(&mut self, kind: EditKind, current: &Snapshot) {
        let coalesce = kind != EditKind::Structural
            && self.last_kind == Some(kind)
            && self.run_end == Some(current.cursor)
            && !self.undo.is_empty();
        if !coalesce {
            if self.undo.len() == self.cap {
                self.undo.pop_front();
            }
            self.undo.push_back(current.clone());
        }
        self.redo.clear();
        self.last_kind = Some(kind);
    }

    /// Note where the mutation left the cursor; the next `record` uses it
    /// for the adjacency check.
    pub fn finish(&mut self, cursor_after: usize) {
        self.run_end = Some(cursor_after);
    }

    /// End the active run without recording anything; the next same-kind
    /// action starts a new unit. Called on cursor motion and mode changes.
    pub fn seal(&mut self) {
        self.last_kind = None;
        self.run_end = None;
    }

    /// Step back, exchanging `current` for the previous snapshot.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snap = self.undo.pop_back()?;
        self.redo.push(current);
        self.seal();
        Some(snap)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snap = self.redo.pop()?;
        if self.undo.len() == self.cap {
            self.undo.pop_front();
        }
        self.undo.push_back(current);
        self.seal();
        Some(snap)
    }
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str, cursor: usize) -> Snapshot {
        Snapshot { text: text.to_string(), cursor }
    }

    #[test]
    fn typing_coalesces_into_one_unit() {
        let mut log = UndoLog::new();
        // type "abc": each record happens before the insert
        log.record(EditKind::InsertRun, &snap("", 0));
        log.finish(1);
        log.record(EditKind::InsertRun, &snap("a", 1));
        log.finish(2);
        log.record(EditKind::InsertRun, &snap("ab", 2));
        log.finish(3);
        assert_eq!(log.depth(), 1);
        let back = log.undo(snap("abc", 3)).unwrap();
        assert_eq!(back, snap("", 0));
    }

    #[test]
    fn cursor_motion_breaks_the_run() {
        let mut log = UndoLog::new();
        log.record(EditKind::InsertRun, &snap("", 0));
        log.finish(1);
        log.seal(); // user moved the cursor
        log.record(EditKind::InsertRun, &snap("a", 0));
        log.finish(1);
        assert_eq!(log.depth(), 2);
    }

    #[test]
    fn non_adjacent_insert_breaks_the_run() {
        let mut log = UndoLog::new();
        log.record(EditKind::InsertRun, &snap("", 0));
        log.finish(1);
        // next insert at offset 5, not 1
        log.record(EditKind::InsertRun, &snap("axxxx", 5));
        assert_eq!(log.depth(), 2);
    }

    #[test]
    fn structural_never_coalesces() {
        let mut log = UndoLog::new();
        log.record(EditKind::Structural, &snap("a", 1));
        log.finish(1);
        log.record(EditKind::Structural, &snap("b", 1));
        assert_eq!(log.depth(), 2);
    }

    #[test]
    fn undo_then_redo_is_identity() {
        let mut log = UndoLog::new();
        log.record(EditKind::Structural, &snap("before", 6));
        log.finish(5);
        let current = snap("after", 5);
        let undone = log.undo(current.clone()).unwrap();
        assert_eq!(undone, snap("before", 6));
        let redone = log.redo(undone).unwrap();
        assert_eq!(redone, current);
    }

    #[test]
    fn fresh_mutation_clears_redo() {
        let mut log = UndoLog::new();
        log.record(EditKind::Structural, &snap("a", 1));
        let _ = log.undo(snap("ab", 2)).unwrap();
        assert_eq!(log.redo_depth(), 1);
        log.record(EditKind::InsertRun, &snap("a", 1));
        assert_eq!(log.redo_depth(), 0);
    }

    #[test]
    fn cap_drops_oldest() {
        let mut log = UndoLog::with_cap(2);
        log.record(EditKind::Structural, &snap("one", 0));
        log.record(EditKind::Structural, &snap("two", 0));
        log.record(EditKind::Structural, &snap("three", 0));
        assert_eq!(log.depth(), 2);
        assert_eq!(log.undo(snap("x", 0)).unwrap(), snap("three", 0));
        assert_eq!(log.undo(snap("y", 0)).unwrap(), snap("two", 0));
        assert!(log.undo(snap("z", 0)).is_none());
    }

    #[test]
    fn delete_run_coalesces_backspaces() {
        let mut log = UndoLog::new();
        // backspace from "abc" cursor 3, three times
        log.record(EditKind::DeleteRun, &snap("abc", 3));
        log.finish(2);
        log.record(EditKind::DeleteRun, &snap("ab", 2));
        log.finish(1);
        log.record(EditKind::DeleteRun, &snap("a", 1));
        log.finish(0);
        assert_eq!(log.depth(), 1);
    }
}
