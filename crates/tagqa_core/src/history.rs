use std::collections::VecDeque;

pub const KEYWORD_HISTORY_DEPTH: usize = 5;
pub const URL_HISTORY_DEPTH: usize = 10;

/// Bounded undo/redo over immutable snapshots of an ordered list.
///
/// The bottom of the undo stack is the floor: it is what `undo` restores last
/// and is never popped itself. Consecutive undo entries always differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory<T> {
    undo: VecDeque<Vec<T>>,
    redo: Vec<Vec<T>>,
    depth: usize,
}

impl<T: Clone + PartialEq> SessionHistory<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            depth: depth.max(1),
        }
    }

    /// Records `state` unless it equals the current snapshot. Clears redo on success.
    pub fn commit(&mut self, state: Vec<T>) -> bool {
        if self.undo.back() == Some(&state) {
            return false;
        }
        self.undo.push_back(state);
        self.evict_overflow();
        self.redo.clear();
        true
    }

    /// Steps back one snapshot and returns the state to restore.
    pub fn undo(&mut self) -> Option<&[T]> {
        if self.undo.len() <= 1 {
            return None;
        }
        let undone = self.undo.pop_back()?;
        self.redo.push(undone);
        self.undo.back().map(Vec::as_slice)
    }

    /// Re-applies the most recently undone snapshot and returns it.
    pub fn redo(&mut self) -> Option<&[T]> {
        let state = self.redo.pop()?;
        self.undo.push_back(state);
        self.evict_overflow();
        self.undo.back().map(Vec::as_slice)
    }

    pub fn current(&self) -> Option<&[T]> {
        self.undo.back().map(Vec::as_slice)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    fn evict_overflow(&mut self) {
        while self.undo.len() > self.depth {
            self.undo.pop_front();
        }
    }
}
