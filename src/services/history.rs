//! Undo history: a bounded stack of reversible mutations.
//!
//! DESIGN
//! ======
//! Fixed-capacity ring buffer over a `VecDeque`: `record` pushes at the
//! back, `pop` takes from the back, and overflow evicts from the front. The
//! evicted entry is simply forgotten; whatever it described can no longer
//! be undone.

use std::collections::VecDeque;

use crate::state::Shape;

/// One reversible store mutation and the payload needed to reverse it.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    /// A stroke was drawn; undo removes it.
    Draw(Shape),
    /// A shape was deleted; undo reinserts it.
    Delete(Shape),
    /// The canvas was cleared; undo restores the pre-clear snapshot.
    Clear(Vec<Shape>),
}

impl HistoryEntry {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draw(_) => "draw",
            Self::Delete(_) => "delete",
            Self::Clear(_) => "clear",
        }
    }
}

#[derive(Debug)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity }
    }

    /// Push an entry. Returns the oldest entry if it fell off the front.
    pub fn record(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.entries.push_back(entry);
        if self.entries.len() > self.capacity {
            return self.entries.pop_front();
        }
        None
    }

    /// Pop the most recent entry.
    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop_back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
