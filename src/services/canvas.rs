//! Canvas service: store mutations paired with their undo history.
//!
//! DESIGN
//! ======
//! `Canvas` owns the shape store and the history log and exposes one method
//! per mutating operation. Methods only change state and return what changed;
//! deciding who hears about it is the websocket dispatch layer's job.
//!
//! | operation        | store        | history            |
//! |------------------|--------------|--------------------|
//! | `create_shape`   | insert       | none               |
//! | `persist_traces` | insert each  | none               |
//! | `draw`           | insert       | `Draw`             |
//! | `delete`         | remove       | `Delete` if found  |
//! | `clear`          | remove all   | `Clear(snapshot)`  |
//! | `undo`           | replay top   | pop                |
//!
//! Undo is global: any session can undo the last action of any other.
//!
//! TRADE-OFFS
//! ==========
//! Undoing a clear merges the saved snapshot back into the store instead of
//! replacing it, so shapes drawn between the clear and the undo survive.

use tracing::debug;

use crate::services::history::{History, HistoryEntry};
use crate::services::simplify::simplify_points;
use crate::services::store::ShapeStore;
use crate::state::Shape;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("malformed {event} payload: {reason}")]
    MalformedPayload { event: String, reason: String },
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("unknown shape: {0}")]
    UnknownShape(String),
    #[error("nothing to undo")]
    HistoryEmpty,
}

impl SyncError {
    pub fn malformed(event: &str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedPayload { event: event.to_owned(), reason: reason.to_string() }
    }
}

impl crate::frame::ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedPayload { .. } => "E_MALFORMED_PAYLOAD",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::UnknownShape(_) => "E_UNKNOWN_SHAPE",
            Self::HistoryEmpty => "E_HISTORY_EMPTY",
        }
    }
}

/// State change produced by replaying one history entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Undone {
    /// A drawn shape was taken back out.
    Removed(String),
    /// A deleted shape was put back.
    Restored(Shape),
    /// A cleared snapshot was merged back.
    RestoredAll(Vec<Shape>),
}

// =============================================================================
// CANVAS
// =============================================================================

#[derive(Debug)]
pub struct Canvas {
    shapes: ShapeStore,
    history: History,
}

impl Canvas {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self { shapes: ShapeStore::new(), history: History::new(history_capacity) }
    }

    #[must_use]
    pub fn shapes(&self) -> &ShapeStore {
        &self.shapes
    }

    /// Direct store access for the sweeper, which bypasses history.
    pub fn shapes_mut(&mut self) -> &mut ShapeStore {
        &mut self.shapes
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Live shapes in insertion order, for session bootstrap.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        self.shapes.snapshot()
    }

    /// Store a predefined figure. Not undoable.
    pub fn create_shape(&mut self, shape: Shape) -> Shape {
        self.shapes.upsert(shape)
    }

    /// Store permanent traces lifted from a brush effect. Not undoable.
    pub fn persist_traces(&mut self, traces: Vec<Shape>) -> usize {
        let count = traces.len();
        for trace in traces {
            self.shapes.upsert(trace);
        }
        count
    }

    /// Store a finished stroke, simplifying long paths first.
    pub fn draw(&mut self, mut shape: Shape) -> Shape {
        shape.points = simplify_points(std::mem::take(&mut shape.points));
        let stored = self.shapes.upsert(shape);
        self.record(HistoryEntry::Draw(stored.clone()));
        stored
    }

    /// Delete a shape by id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownShape` if no shape has that id; nothing is recorded.
    pub fn delete(&mut self, id: &str) -> Result<Shape, SyncError> {
        let removed = self
            .shapes
            .remove(id)
            .ok_or_else(|| SyncError::UnknownShape(id.to_owned()))?;
        self.record(HistoryEntry::Delete(removed.clone()));
        Ok(removed)
    }

    /// Remove every shape, remembering the snapshot for undo.
    pub fn clear(&mut self) -> usize {
        let snapshot = self.shapes.drain();
        let count = snapshot.len();
        self.record(HistoryEntry::Clear(snapshot));
        count
    }

    /// Pop and reverse the most recent history entry.
    ///
    /// # Errors
    ///
    /// Returns `HistoryEmpty` when there is nothing left to undo.
    pub fn undo(&mut self) -> Result<Undone, SyncError> {
        let entry = self.history.pop().ok_or(SyncError::HistoryEmpty)?;
        let undone = match entry {
            HistoryEntry::Draw(shape) => {
                if self.shapes.remove(&shape.id).is_none() {
                    debug!(id = %shape.id, "undo draw: shape already gone");
                }
                Undone::Removed(shape.id)
            }
            HistoryEntry::Delete(shape) => Undone::Restored(self.shapes.upsert(shape)),
            HistoryEntry::Clear(snapshot) => {
                let restored = snapshot
                    .into_iter()
                    .map(|shape| self.shapes.upsert(shape))
                    .collect();
                Undone::RestoredAll(restored)
            }
        };
        Ok(undone)
    }

    fn record(&mut self, entry: HistoryEntry) {
        if let Some(dropped) = self.history.record(entry) {
            debug!(
                kind = dropped.label(),
                capacity = self.history.capacity(),
                "history full; oldest entry forgotten"
            );
        }
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
