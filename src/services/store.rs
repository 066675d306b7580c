//! Shape store: the authoritative id -> shape map.
//!
//! DESIGN
//! ======
//! Backed by an `IndexMap` so snapshots iterate in insertion order, which is
//! the order new sessions replay on bootstrap. Re-inserting an existing id
//! replaces the record in place and keeps its original position.
//!
//! The store performs no geometry validation; callers hand it well-formed
//! records. It does own the timestamp: every insert is stamped with the
//! server clock, overriding whatever the client sent, so eviction ages are
//! always measured from server-observed arrival.

use indexmap::IndexMap;

use crate::frame::now_ms;
use crate::state::Shape;

#[derive(Debug, Default)]
pub struct ShapeStore {
    shapes: IndexMap<String, Shape>,
}

impl ShapeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a shape, stamped with the current time.
    pub fn upsert(&mut self, shape: Shape) -> Shape {
        self.upsert_at(shape, now_ms())
    }

    /// Insert or replace a shape with an explicit timestamp.
    pub fn upsert_at(&mut self, mut shape: Shape, now_ms: i64) -> Shape {
        shape.timestamp = now_ms;
        let stored = shape.clone();
        self.shapes.insert(shape.id.clone(), shape);
        stored
    }

    /// Remove a shape, preserving the relative order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Shape> {
        self.shapes.shift_remove(id)
    }

    #[cfg(test)]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.get(id)
    }

    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.shapes.contains_key(id)
    }

    /// All live shapes in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Shape> {
        self.shapes.values().cloned().collect()
    }

    /// Remove every shape and return them in insertion order.
    pub fn drain(&mut self) -> Vec<Shape> {
        self.shapes.drain(..).map(|(_, shape)| shape).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
