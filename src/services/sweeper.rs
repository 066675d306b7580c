//! Eviction sweeper: bounds memory by shape count and shape age.
//!
//! DESIGN
//! ======
//! A background task wakes on a fixed interval, takes the board write lock
//! (the same single-writer discipline as event handling) and applies two
//! independent bounds:
//!
//! 1. Count: above `max_shapes`, the oldest shapes by timestamp go first.
//! 2. Age: any shape older than `shape_ttl` goes, whatever the count.
//!
//! Evictions bypass the undo history and are not announced to clients.
//! They cannot be undone.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::frame::now_ms;
use crate::services::store::ShapeStore;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepLimits {
    pub max_shapes: usize,
    pub shape_ttl: Duration,
}

/// Ids removed by one sweep, grouped by the bound that removed them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub by_count: Vec<String>,
    pub by_age: Vec<String>,
}

impl SweepReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_count.len() + self.by_age.len()
    }
}

/// Spawn the periodic sweeper. Returns a handle for shutdown.
pub fn spawn_sweeper_task(state: AppState) -> JoinHandle<()> {
    let period = state.config.sweep_interval;
    let limits = state.config.sweep_limits();
    info!(
        period_secs = period.as_secs(),
        max_shapes = limits.max_shapes,
        shape_ttl_secs = limits.shape_ttl.as_secs(),
        "eviction sweeper configured"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately; nothing to evict at startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_sweep(&state, limits).await;
        }
    })
}

/// One sweep against the live board, under the board write lock.
pub async fn run_sweep(state: &AppState, limits: SweepLimits) -> SweepReport {
    let mut board = state.board.write().await;
    let report = sweep(board.canvas.shapes_mut(), limits, now_ms());
    let remaining = board.canvas.shapes().len();
    drop(board);

    if report.total() > 0 {
        info!(
            by_count = report.by_count.len(),
            by_age = report.by_age.len(),
            remaining,
            "sweep evicted shapes"
        );
    } else {
        debug!(remaining, "sweep found nothing to evict");
    }
    report
}

/// Apply the count bound, then the age bound, at time `now_ms`.
pub fn sweep(store: &mut ShapeStore, limits: SweepLimits, now_ms: i64) -> SweepReport {
    let mut report = SweepReport::default();
    if store.is_empty() {
        return report;
    }

    // PHASE: COUNT BOUND
    // Stable sort, so equal timestamps evict in insertion order.
    if store.len() > limits.max_shapes {
        let excess = store.len() - limits.max_shapes;
        let mut by_age: Vec<(i64, String)> = store
            .iter()
            .map(|shape| (shape.timestamp, shape.id.clone()))
            .collect();
        by_age.sort_by_key(|(ts, _)| *ts);

        for (_, id) in by_age.into_iter().take(excess) {
            store.remove(&id);
            report.by_count.push(id);
        }
    }

    // PHASE: AGE BOUND
    let ttl_ms = i64::try_from(limits.shape_ttl.as_millis()).unwrap_or(i64::MAX);
    let expired: Vec<String> = store
        .iter()
        .filter(|shape| now_ms.saturating_sub(shape.timestamp) > ttl_ms)
        .map(|shape| shape.id.clone())
        .collect();
    for id in expired {
        store.remove(&id);
        report.by_age.push(id);
    }

    report
}

#[cfg(test)]
#[path = "sweeper_test.rs"]
mod tests;
