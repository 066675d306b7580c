//! WebSocket handler: session lifecycle and event fan-out.
//!
//! DESIGN
//! ======
//! On upgrade, registers the session and enters a `select!` loop:
//! - Incoming client frames -> parse + dispatch by event name
//! - Frames broadcast by peers -> forward to this client
//!
//! Handler functions are pure business logic: they validate the payload,
//! mutate the board, and return an `Outcome`. The dispatch layer owns all
//! outbound concerns. Handling and fan-out run under one board write guard,
//! so every session observes events in the server's processing order.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade -> queue `initShapes` (store snapshot) to this session only
//! 2. Client sends frames -> dispatch -> handler returns Outcome
//! 3. Dispatch applies Outcome (silent / peers only / everyone)
//! 4. Close -> unregister -> `userDisconnected` to remaining sessions
//!
//! ERROR HANDLING
//! ==============
//! There is no error channel back to clients. Malformed or unknown events
//! are logged and dropped; nothing is partially applied.

use std::time::Instant;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{self, ErrorCode, Frame, now_ms};
use crate::services::canvas::{SyncError, Undone};
use crate::services::throttle::{EventClass, Interface, Throttle, ThrottleConfig};
use crate::state::{AppState, BoardState, Shape, ShapeKind};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
#[derive(Debug)]
enum Outcome {
    /// Nothing leaves the server (throttled relay).
    Silent,
    /// Send to every session except the sender.
    BroadcastExcludeSender(Frame),
    /// Send to every session including the sender.
    Broadcast(Frame),
}

// =============================================================================
// SESSION
// =============================================================================

/// Per-connection state owned by the connection task.
pub(crate) struct Session {
    pub(crate) id: Uuid,
    throttle: Throttle,
}

impl Session {
    pub(crate) fn new(id: Uuid, throttle: ThrottleConfig) -> Self {
        Self { id, throttle: Throttle::new(throttle) }
    }

    fn socket_id(&self) -> String {
        self.id.to_string()
    }

    /// Throttle check; logs and returns false when the event should be dropped.
    fn admit(&mut self, class: EventClass, now: Instant) -> bool {
        match self.throttle.admit_at(class, now) {
            Ok(()) => true,
            Err(e) => {
                debug!(client_id = %self.id, code = e.error_code(), reason = %e, "ws: throttled");
                false
            }
        }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for frames fanned out by other sessions.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.config.client_channel_capacity);
    let mut session = Session::new(client_id, state.config.throttle);

    let shapes = connect(&state, client_id, client_tx).await;
    info!(%client_id, shapes, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        process_inbound_text(&state, &mut session, text.as_str(), Instant::now()).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    disconnect(&state, client_id).await;
    info!(%client_id, "ws: client disconnected");
}

/// Register a session and queue its bootstrap snapshot.
///
/// The snapshot is queued before the sender becomes visible to broadcasts,
/// so `initShapes` is always the first frame a session sees.
pub(crate) async fn connect(state: &AppState, client_id: Uuid, tx: mpsc::Sender<Frame>) -> usize {
    let mut board = state.board.write().await;
    let shapes = board.canvas.snapshot();
    let count = shapes.len();
    if tx.try_send(Frame::new(frame::INIT_SHAPES, shapes_value(&shapes))).is_err() {
        warn!(%client_id, "ws: could not queue initShapes");
    }
    board.clients.insert(client_id, tx);
    count
}

/// Unregister a session and tell the others. Its shapes stay.
pub(crate) async fn disconnect(state: &AppState, client_id: Uuid) {
    let mut board = state.board.write().await;
    board.clients.remove(&client_id);
    let notice = Frame::new(frame::USER_DISCONNECTED, json!({ "socketId": client_id.to_string() }));
    board.broadcast(&notice, None);
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and fully handle one inbound text frame, including fan-out.
pub(crate) async fn process_inbound_text(state: &AppState, session: &mut Session, text: &str, now: Instant) {
    let req: Frame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            log_rejected(session.id, &SyncError::malformed("frame", e));
            return;
        }
    };

    if !is_high_frequency(&req.event) {
        info!(client_id = %session.id, event = %req.event, "ws: recv event");
    }

    let mut board = state.board.write().await;
    match dispatch(&mut board, session, req, now) {
        Ok(outcome) => apply_outcome(&board, session.id, outcome),
        Err(e) => log_rejected(session.id, &e),
    }
}

fn dispatch(board: &mut BoardState, session: &mut Session, req: Frame, now: Instant) -> Result<Outcome, SyncError> {
    let Frame { event, data } = req;
    match event.as_str() {
        frame::DRAWING => Ok(Outcome::BroadcastExcludeSender(Frame::new(frame::DRAWING, data))),
        frame::TEXTURE => Ok(handle_texture(session, data, now)),
        frame::BRUSH_EFFECT => handle_brush_effect(board, session, data, now),
        frame::CLEANUP_USER_EFFECTS => handle_cleanup_user_effects(session, &data),
        frame::SHAPE_CREATE => handle_shape_create(board, data),
        frame::DRAW => handle_draw(board, data),
        frame::DELETE_SHAPE => handle_delete(board, data),
        frame::CLEAR_CANVAS => Ok(handle_clear(board)),
        frame::UNDO => handle_undo(board),
        frame::ADMIN_RESET_BRUSH_EFFECTS => Ok(Outcome::Broadcast(Frame::bare(frame::ADMIN_RESET_BRUSH_EFFECTS))),
        frame::TEST_BROADCAST => Ok(handle_test_broadcast(board, session, &data)),
        _ => Err(SyncError::UnknownEvent(event)),
    }
}

fn apply_outcome(board: &BoardState, client_id: Uuid, outcome: Outcome) {
    match outcome {
        Outcome::Silent => {}
        Outcome::BroadcastExcludeSender(frame) => board.broadcast(&frame, Some(client_id)),
        Outcome::Broadcast(frame) => board.broadcast(&frame, None),
    }
}

fn log_rejected(client_id: Uuid, err: &SyncError) {
    match err {
        SyncError::MalformedPayload { .. } | SyncError::UnknownEvent(_) => {
            warn!(%client_id, code = err.error_code(), error = %err, "ws: dropped inbound event");
        }
        SyncError::UnknownShape(_) | SyncError::HistoryEmpty => {
            debug!(%client_id, code = err.error_code(), error = %err, "ws: no-op event");
        }
    }
}

fn is_high_frequency(event: &str) -> bool {
    matches!(event, frame::DRAWING | frame::TEXTURE | frame::BRUSH_EFFECT)
}

// =============================================================================
// EFFECT HANDLERS
// =============================================================================

fn handle_texture(session: &mut Session, data: Value, now: Instant) -> Outcome {
    if !session.admit(EventClass::Texture, now) {
        return Outcome::Silent;
    }
    Outcome::BroadcastExcludeSender(Frame::new(frame::TEXTURE, data))
}

/// Permanent traces are stored whether or not the effect itself is
/// throttled; only the relay is subject to the window.
fn handle_brush_effect(
    board: &mut BoardState,
    session: &mut Session,
    data: Value,
    now: Instant,
) -> Result<Outcome, SyncError> {
    let Value::Object(mut effect) = data else {
        return Err(SyncError::malformed(frame::BRUSH_EFFECT, "expected an object"));
    };

    match effect.get("permanentTraces") {
        None | Some(Value::Null) => {}
        Some(Value::Array(traces)) => {
            let shapes: Vec<Shape> = traces
                .iter()
                .filter_map(|trace| parse_trace(session.id, trace))
                .collect();
            let stored = board.canvas.persist_traces(shapes);
            debug!(client_id = %session.id, stored, "ws: persisted permanent traces");
        }
        Some(_) => return Err(SyncError::malformed(frame::BRUSH_EFFECT, "permanentTraces must be an array")),
    }

    let interface = Interface::parse(effect.get("interface").and_then(Value::as_str));
    if !session.admit(EventClass::BrushEffect(interface), now) {
        return Ok(Outcome::Silent);
    }

    effect.insert("socketId".into(), json!(session.socket_id()));
    effect.insert("serverTimestamp".into(), json!(now_ms()));
    Ok(Outcome::BroadcastExcludeSender(Frame::new(frame::BRUSH_EFFECT, Value::Object(effect))))
}

/// A trace without an id gets a server-generated one; an unparseable trace
/// is skipped without rejecting the rest of the effect.
fn parse_trace(client_id: Uuid, trace: &Value) -> Option<Shape> {
    match serde_json::from_value::<ShapePayload>(trace.clone()) {
        Ok(payload) => {
            let id = payload.id.clone().filter(|id| !id.is_empty());
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            Some(payload.into_shape_with_id(id, ShapeKind::Trace))
        }
        Err(e) => {
            warn!(%client_id, error = %e, "ws: skipped malformed permanent trace");
            None
        }
    }
}

fn handle_cleanup_user_effects(session: &Session, data: &Value) -> Result<Outcome, SyncError> {
    let Some(user_id) = data.get("userId").filter(|v| !v.is_null()) else {
        return Err(SyncError::malformed(frame::CLEANUP_USER_EFFECTS, "missing userId"));
    };
    let notice = json!({ "userId": user_id, "socketId": session.socket_id() });
    Ok(Outcome::BroadcastExcludeSender(Frame::new(frame::CLEANUP_USER_EFFECTS, notice)))
}

// =============================================================================
// SHAPE HANDLERS
// =============================================================================

fn handle_shape_create(board: &mut BoardState, data: Value) -> Result<Outcome, SyncError> {
    let payload: ShapePayload = parse_payload(frame::SHAPE_CREATE, data)?;
    let shape = payload.into_shape(frame::SHAPE_CREATE, ShapeKind::Figure)?;
    let stored = board.canvas.create_shape(shape);
    Ok(Outcome::BroadcastExcludeSender(Frame::new(frame::SHAPE_CREATE, shape_value(&stored))))
}

fn handle_draw(board: &mut BoardState, data: Value) -> Result<Outcome, SyncError> {
    let payload: ShapePayload = parse_payload(frame::DRAW, data)?;
    match payload.fields.get("points") {
        None | Some(Value::Null) => return Err(SyncError::malformed(frame::DRAW, "missing points")),
        Some(points) if !is_flat_coordinates(points) => {
            return Err(SyncError::malformed(frame::DRAW, "points must be a flat numeric sequence"));
        }
        Some(_) => {}
    }
    let shape = payload.into_shape(frame::DRAW, ShapeKind::Stroke)?;
    let stored = board.canvas.draw(shape);
    Ok(Outcome::BroadcastExcludeSender(Frame::new(frame::DRAW, shape_value(&stored))))
}

/// Deleting an unknown id is a no-op on the store, but the notice still goes
/// out to everyone so clients converge on the server's view.
fn handle_delete(board: &mut BoardState, data: Value) -> Result<Outcome, SyncError> {
    #[derive(Deserialize)]
    struct DeletePayload {
        id: String,
    }

    let DeletePayload { id } = parse_payload(frame::DELETE_SHAPE, data)?;
    if let Err(e) = board.canvas.delete(&id) {
        debug!(code = e.error_code(), error = %e, "ws: delete of unknown shape");
    }
    Ok(Outcome::Broadcast(Frame::new(frame::DELETE_SHAPE, json!({ "id": id }))))
}

fn handle_clear(board: &mut BoardState) -> Outcome {
    let cleared = board.canvas.clear();
    info!(cleared, "ws: canvas cleared");
    Outcome::Broadcast(Frame::bare(frame::CLEAR_CANVAS))
}

fn handle_undo(board: &mut BoardState) -> Result<Outcome, SyncError> {
    let frame = match board.canvas.undo()? {
        Undone::Removed(id) => Frame::new(frame::DELETE_SHAPE, json!({ "id": id })),
        Undone::Restored(shape) => Frame::new(frame::DRAW, shape_value(&shape)),
        Undone::RestoredAll(shapes) => Frame::new(frame::RESTORE_SHAPES, shapes_value(&shapes)),
    };
    info!(event = %frame.event, remaining = board.canvas.history().len(), "ws: undo applied");
    Ok(Outcome::Broadcast(frame))
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

fn handle_test_broadcast(board: &BoardState, session: &Session, data: &Value) -> Outcome {
    let message = data.get("message").cloned().unwrap_or(Value::Null);
    let echo = json!({
        "message": message,
        "from": session.socket_id(),
        "timestamp": now_ms(),
        "totalClients": board.clients.len(),
    });
    Outcome::Broadcast(Frame::new(frame::TEST_BROADCAST_RECEIVED, echo))
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Inbound shape fields. Everything but the id is kept in `fields` until the
/// shape is built.
#[derive(Debug, Deserialize)]
struct ShapePayload {
    id: Option<String>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl ShapePayload {
    fn into_shape(self, event: &str, kind: ShapeKind) -> Result<Shape, SyncError> {
        let Some(id) = self.id.clone().filter(|id| !id.is_empty()) else {
            return Err(SyncError::malformed(event, "missing id"));
        };
        Ok(self.into_shape_with_id(id, kind))
    }

    /// Geometry and style are lifted into typed fields when they have the
    /// stroke form (flat numeric points, string color, numeric size).
    /// Anything else passes through `params` untouched.
    fn into_shape_with_id(self, id: String, kind: ShapeKind) -> Shape {
        let mut params = self.fields;
        // Server-owned fields; never trusted from the client.
        params.remove("kind");
        params.remove("timestamp");
        let points = take_typed(&mut params, "points").unwrap_or_default();
        let color = take_typed(&mut params, "color");
        let size = take_typed(&mut params, "size");
        Shape { color, size, params, ..Shape::new(id, kind).with_points(points) }
    }
}

/// Remove `key` from `params` if it decodes as `T`, otherwise leave it.
fn take_typed<T: DeserializeOwned>(params: &mut Map<String, Value>, key: &str) -> Option<T> {
    let decoded = serde_json::from_value(params.get(key)?.clone()).ok()?;
    params.remove(key);
    Some(decoded)
}

/// Strokes are simplified, so `draw` needs a flat `[x0, y0, x1, y1, ...]`.
fn is_flat_coordinates(points: &Value) -> bool {
    points.as_array().is_some_and(|values| values.iter().all(Value::is_number))
}

fn parse_payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, SyncError> {
    serde_json::from_value(data).map_err(|e| SyncError::malformed(event, e))
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), axum::Error> {
    let json = match frame.to_text() {
        Ok(j) => j,
        Err(e) => {
            warn!(event = %frame.event, error = %e, "ws: failed to serialize frame");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}

fn shape_value(shape: &Shape) -> Value {
    serde_json::to_value(shape).unwrap_or_default()
}

fn shapes_value(shapes: &[Shape]) -> Value {
    serde_json::to_value(shapes).unwrap_or_default()
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
