//! Runtime configuration loaded from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a compiled-in default so the server starts with no
//! environment at all. Unparseable values fall back to the default rather
//! than aborting startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::services::sweeper::SweepLimits;
use crate::services::throttle::ThrottleConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_SHAPES: usize = 500;
pub const DEFAULT_SHAPE_TTL_SECS: u64 = 300;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_HISTORY: usize = 2;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port. The bind address is always `0.0.0.0`.
    pub port: u16,
    /// Root directory for UI pages and static assets.
    pub public_dir: PathBuf,
    pub max_shapes: usize,
    pub shape_ttl: Duration,
    pub sweep_interval: Duration,
    pub history_capacity: usize,
    pub throttle: ThrottleConfig,
    /// Outbound frame queue depth per connected session.
    pub client_channel_capacity: usize,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            public_dir: std::env::var("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_public_dir()),
            max_shapes: env_parse("MAX_SHAPES", DEFAULT_MAX_SHAPES),
            shape_ttl: Duration::from_secs(env_parse("SHAPE_TTL_SECS", DEFAULT_SHAPE_TTL_SECS)),
            sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)),
            history_capacity: env_parse("MAX_HISTORY", DEFAULT_MAX_HISTORY),
            throttle: ThrottleConfig::from_env(),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", DEFAULT_CLIENT_CHANNEL_CAPACITY).max(1),
        }
    }

    #[must_use]
    pub fn sweep_limits(&self) -> SweepLimits {
        SweepLimits { max_shapes: self.max_shapes, shape_ttl: self.shape_ttl }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            public_dir: default_public_dir(),
            max_shapes: DEFAULT_MAX_SHAPES,
            shape_ttl: Duration::from_secs(DEFAULT_SHAPE_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            history_capacity: DEFAULT_MAX_HISTORY,
            throttle: ThrottleConfig::default(),
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

fn default_public_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public")
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
