//! Per-connection broadcast throttling for high-frequency effect events.
//!
//! DESIGN
//! ======
//! Each session owns one `Throttle`, so there is no shared state and nothing
//! to reset: it is dropped with the connection. For every event class we
//! remember the instant of the last accepted event and admit a new one only
//! once the class window has fully elapsed. Rejected events are dropped,
//! never queued.
//!
//! | class                      | default window |
//! |----------------------------|----------------|
//! | texture                    | 100 ms         |
//! | brush effect, admin        | 100 ms         |
//! | brush effect, atelier      | 150 ms         |
//! | brush effect, other        | 250 ms         |
//!
//! `drawing` relays are never throttled and have no class.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::env_parse;

const DEFAULT_TEXTURE_MS: u64 = 100;
const DEFAULT_BRUSH_ADMIN_MS: u64 = 100;
const DEFAULT_BRUSH_ATELIER_MS: u64 = 150;
const DEFAULT_BRUSH_DEFAULT_MS: u64 = 250;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub texture: Duration,
    pub brush_admin: Duration,
    pub brush_atelier: Duration,
    pub brush_default: Duration,
}

impl ThrottleConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            texture: Duration::from_millis(env_parse("THROTTLE_TEXTURE_MS", DEFAULT_TEXTURE_MS)),
            brush_admin: Duration::from_millis(env_parse("THROTTLE_BRUSH_ADMIN_MS", DEFAULT_BRUSH_ADMIN_MS)),
            brush_atelier: Duration::from_millis(env_parse("THROTTLE_BRUSH_ATELIER_MS", DEFAULT_BRUSH_ATELIER_MS)),
            brush_default: Duration::from_millis(env_parse("THROTTLE_BRUSH_DEFAULT_MS", DEFAULT_BRUSH_DEFAULT_MS)),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            texture: Duration::from_millis(DEFAULT_TEXTURE_MS),
            brush_admin: Duration::from_millis(DEFAULT_BRUSH_ADMIN_MS),
            brush_atelier: Duration::from_millis(DEFAULT_BRUSH_ATELIER_MS),
            brush_default: Duration::from_millis(DEFAULT_BRUSH_DEFAULT_MS),
        }
    }
}

// =============================================================================
// EVENT CLASSES
// =============================================================================

/// UI a brush effect originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Admin,
    Atelier,
    Other,
}

impl Interface {
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("admin") => Self::Admin,
            Some("atelier") => Self::Atelier,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Texture,
    BrushEffect(Interface),
}

/// Admission is tracked per class, not per interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ClassKey {
    Texture,
    BrushEffect,
}

impl EventClass {
    fn key(self) -> ClassKey {
        match self {
            Self::Texture => ClassKey::Texture,
            Self::BrushEffect(_) => ClassKey::BrushEffect,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::BrushEffect(_) => "brushEffect",
        }
    }

    #[must_use]
    pub fn window(self, config: &ThrottleConfig) -> Duration {
        match self {
            Self::Texture => config.texture,
            Self::BrushEffect(Interface::Admin) => config.brush_admin,
            Self::BrushEffect(Interface::Atelier) => config.brush_atelier,
            Self::BrushEffect(Interface::Other) => config.brush_default,
        }
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Admission denied. Not a failure: the event is silently dropped.
#[derive(Debug, thiserror::Error)]
#[error("{class} throttled (window {window_ms}ms)")]
pub struct Throttled {
    pub class: &'static str,
    pub window_ms: u128,
}

impl crate::frame::ErrorCode for Throttled {
    fn error_code(&self) -> &'static str {
        "E_THROTTLED"
    }
}

// =============================================================================
// THROTTLE
// =============================================================================

#[derive(Debug)]
pub struct Throttle {
    config: ThrottleConfig,
    last_accepted: HashMap<ClassKey, Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config, last_accepted: HashMap::new() }
    }

    /// Admit an event arriving at `now`, recording it if accepted.
    ///
    /// # Errors
    ///
    /// Returns `Throttled` if the class window has not elapsed since the
    /// last accepted event of the same class.
    pub fn admit_at(&mut self, class: EventClass, now: Instant) -> Result<(), Throttled> {
        let window = class.window(&self.config);
        if let Some(last) = self.last_accepted.get(&class.key()) {
            if now.saturating_duration_since(*last) < window {
                return Err(Throttled { class: class.name(), window_ms: window.as_millis() });
            }
        }
        self.last_accepted.insert(class.key(), now);
        Ok(())
    }
}

#[cfg(test)]
#[path = "throttle_test.rs"]
mod tests;
