//! Periodic worker tasks.
//!
//! Each worker owns its own interval, reads the shared snapshots, and reports
//! to the controller loop through [`DetectorSignals`](crate::DetectorSignals).
//! Workers never restart themselves; a worker that stops sending heartbeats
//! is caught by the controller's staleness check.

mod log_watcher;
mod missed_blocks;
mod missed_rounds;
mod poller;
mod schedule;

pub use log_watcher::run_log_watcher;
pub use missed_blocks::run_missed_blocks;
pub use missed_rounds::run_missed_rounds;
pub use poller::{poll_head, run_poller};
pub use schedule::ScheduleTracker;

use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// An interval that skips ticks it was too busy to take.
fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
