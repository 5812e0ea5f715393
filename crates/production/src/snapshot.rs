//! Copy-on-publish snapshots shared between workers.
//!
//! Each snapshot has exactly one writer. Readers load an `Arc` and never see
//! a partially updated value.

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use standby_types::{BlockObservation, ScheduleView};
use std::sync::Arc;
use std::time::Duration;

/// Latest head observation, written by the chain poller.
#[derive(Debug, Clone, Default)]
pub struct SharedObservation {
    inner: Arc<ArcSwapOption<BlockObservation>>,
}

impl SharedObservation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, observation: BlockObservation) {
        self.inner.store(Some(Arc::new(observation)));
    }

    pub fn load(&self) -> Option<Arc<BlockObservation>> {
        self.inner.load_full()
    }

    /// The latest observation, if one exists and the node is synced.
    pub fn synced(&self, now: DateTime<Utc>, threshold: Duration) -> Option<Arc<BlockObservation>> {
        self.load().filter(|obs| !obs.is_syncing(now, threshold))
    }
}

/// Latest schedule view, written by the schedule tracker.
#[derive(Debug, Clone, Default)]
pub struct SharedSchedule {
    inner: Arc<ArcSwap<ScheduleView>>,
}

impl SharedSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, view: ScheduleView) {
        self.inner.store(Arc::new(view));
    }

    pub fn load(&self) -> Arc<ScheduleView> {
        self.inner.load_full()
    }
}
