//! Domain services used by the websocket route and the sweeper task.
//!
//! ARCHITECTURE
//! ============
//! Service modules own canvas state and policy so route handlers stay
//! focused on protocol translation and fan-out.

pub mod canvas;
pub mod history;
pub mod simplify;
pub mod store;
pub mod sweeper;
pub mod throttle;
