//! Frame: the wire envelope for every canvas event.
//!
//! ARCHITECTURE
//! ============
//! Each websocket text message, in either direction, is one JSON object
//! `{"event": "<name>", "data": <payload>}`. The envelope never inspects
//! `data`; the websocket dispatch layer routes on `event` and each handler
//! parses the payload into its own typed shape.
//!
//! Events without a payload (`undo`, `clearCanvas`, ...) may omit `data`
//! entirely or send `null`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// EVENT NAMES
// =============================================================================

/// Server -> new client: full store snapshot on connect.
pub const INIT_SHAPES: &str = "initShapes";
pub const DRAWING: &str = "drawing";
pub const TEXTURE: &str = "texture";
pub const BRUSH_EFFECT: &str = "brushEffect";
pub const CLEANUP_USER_EFFECTS: &str = "cleanupUserEffects";
pub const SHAPE_CREATE: &str = "shapeCreate";
pub const DRAW: &str = "draw";
pub const DELETE_SHAPE: &str = "deleteShape";
pub const CLEAR_CANVAS: &str = "clearCanvas";
/// Server -> all: bulk restore after undoing a clear.
pub const RESTORE_SHAPES: &str = "restoreShapes";
pub const UNDO: &str = "undo";
pub const ADMIN_RESET_BRUSH_EFFECTS: &str = "adminResetBrushEffects";
pub const TEST_BROADCAST: &str = "testBroadcast";
pub const TEST_BROADCAST_RECEIVED: &str = "testBroadcastReceived";
/// Server -> remaining clients when a session closes.
pub const USER_DISCONNECTED: &str = "userDisconnected";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// Grepable error code attached to log lines for failed events.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }

    /// Frame with no payload.
    pub fn bare(event: impl Into<String>) -> Self {
        Self::new(event, Value::Null)
    }

    /// Serialize for the websocket text channel.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the payload cannot be encoded.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
