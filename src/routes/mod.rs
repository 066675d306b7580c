//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router serves the three UI entry pages, the health probe, the
//! websocket endpoint, and everything else under the public directory as
//! static assets.

pub mod ws;

use axum::Router;
use axum::extract::State;
use axum::routing::get;
use axum::Json;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::frame::now_ms;
use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let public = state.config.public_dir.clone();
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route_service("/", ServeFile::new(public.join("index.html")))
        .route_service("/admin", ServeFile::new(public.join("admin.html")))
        .route_service("/atelier", ServeFile::new(public.join("atelier.html")))
        .route("/health", get(health))
        .route("/ws", get(ws::handle_ws))
        .fallback_service(ServeDir::new(public))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: i64,
    shapes: usize,
    clients: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let board = state.board.read().await;
    Json(Health {
        status: "ok",
        timestamp: now_ms(),
        shapes: board.canvas.shapes().len(),
        clients: board.clients.len(),
    })
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
