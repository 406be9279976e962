//! Bounded linear undo/redo history
//!
//! `past` is a ring buffer capped at `limit` snapshots; the oldest entry is
//! evicted in O(1). `future` is cleared by every new record.

use std::collections::VecDeque;
use std::mem;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    future: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Record the snapshot being replaced by a new mutation.
    pub fn record(&mut self, snapshot: T) {
        self.push_past(snapshot);
        self.future.clear();
    }

    /// Swap `current` with the most recent past snapshot.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        self.future.push(mem::replace(current, previous));
        true
    }

    /// Swap `current` with the most recently undone snapshot.
    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let replaced = mem::replace(current, next);
        self.push_past(replaced);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    fn push_past(&mut self, snapshot: T) {
        if self.limit == 0 {
            return;
        }
        if self.past.len() == self.limit {
            self.past.pop_front();
        }
        self.past.push_back(snapshot);
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
