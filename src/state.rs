//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the one live board: the canvas (shape store + undo history) and the
//! outbound channels of every connected session, all behind a single
//! `RwLock`. Every mutation and the fan-out it triggers happen under one
//! write guard, so broadcast order is exactly processing order. The sweeper
//! takes the same lock.
//!
//! LIFECYCLE
//! =========
//! Built once in `main`, cloned into each connection handler and the sweeper
//! task, dropped on shutdown. Nothing here is a process global.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::frame::Frame;
use crate::services::canvas::Canvas;

// =============================================================================
// SHAPE
// =============================================================================

/// What produced a shape record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// Finished freehand stroke from a `draw` event.
    Stroke,
    /// Permanent trace extracted from a `brushEffect` payload.
    Trace,
    /// Predefined figure from a `shapeCreate` event.
    Figure,
}

/// One persisted canvas entity. Immutable once stored; only deletion
/// removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    /// Flat `[x0, y0, x1, y1, ...]` coordinate sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    /// Shape-specific parameters, passed through to clients untouched.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Milliseconds since Unix epoch, stamped by the store on insert.
    #[serde(default)]
    pub timestamp: i64,
}

impl Shape {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            points: Vec::new(),
            color: None,
            size: None,
            params: serde_json::Map::new(),
            timestamp: 0,
        }
    }

    #[must_use]
    pub fn with_points(mut self, points: Vec<f64>) -> Self {
        self.points = points;
        self
    }
}

// =============================================================================
// BOARD STATE
// =============================================================================

/// The single live board: canvas plus connected session senders.
pub struct BoardState {
    pub canvas: Canvas,
    /// Connected sessions: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
}

impl BoardState {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self { canvas: Canvas::new(history_capacity), clients: HashMap::new() }
    }

    /// Send a frame to every session, optionally skipping one.
    ///
    /// Best-effort: a session whose queue is full or closed misses this
    /// frame; the writer never waits on a slow reader.
    pub fn broadcast(&self, frame: &Frame, exclude: Option<Uuid>) {
        for (client_id, tx) in &self.clients {
            if exclude == Some(*client_id) {
                continue;
            }
            if tx.try_send(frame.clone()).is_err() {
                tracing::debug!(%client_id, event = %frame.event, "broadcast dropped for slow or closed session");
            }
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<RwLock<BoardState>>,
    pub config: Arc<Config>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        let board = BoardState::new(config.history_capacity);
        Self { board: Arc::new(RwLock::new(board)), config: Arc::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
