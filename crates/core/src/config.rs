//! Tuning for the detectors and the controller.
//!
//! The defaults match a 21-producer schedule with half-second blocks. Other
//! chains should override `active_producers` and `blocks_per_round`.

use std::time::Duration;

/// Thresholds for [`MissedBlockDetector`](crate::MissedBlockDetector).
#[derive(Debug, Clone)]
pub struct MissedBlockConfig {
    /// Consecutive ticks without head advance, while the protected producer
    /// is due, before declaring it missing. At one tick per second this is
    /// roughly four half-second blocks.
    pub stalled_ticks: u32,

    /// Head blocks older than this mean the node is not synced and the
    /// detector stays dormant.
    pub sync_threshold: Duration,
}

impl Default for MissedBlockConfig {
    fn default() -> Self {
        Self {
            stalled_ticks: 2,
            sync_threshold: Duration::from_secs(60),
        }
    }
}

/// Thresholds for [`MissedRoundDetector`](crate::MissedRoundDetector).
#[derive(Debug, Clone)]
pub struct MissedRoundConfig {
    /// Size of the active producer set.
    pub active_producers: u32,

    /// Blocks each producer signs per turn, plus slack.
    pub blocks_per_round: u32,

    /// How long a schedule boundary must be in the past before the
    /// last-produced bookkeeping is trusted.
    pub schedule_grace: Duration,

    /// Head blocks older than this mean the node is not synced.
    pub sync_threshold: Duration,
}

impl MissedRoundConfig {
    /// Blocks the protected producer may lag the head before it is missing.
    pub fn lag_blocks(&self) -> u32 {
        self.active_producers.saturating_mul(self.blocks_per_round)
    }
}

impl Default for MissedRoundConfig {
    fn default() -> Self {
        Self {
            active_producers: 21,
            blocks_per_round: 13,
            schedule_grace: Duration::from_secs(6 * 60),
            sync_threshold: Duration::from_secs(60),
        }
    }
}

/// Fail-closed limits for the [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Failures tolerated without an intervening heartbeat. One more is fatal.
    pub failure_limit: u32,

    /// A detector silent for strictly longer than this is fatal.
    pub heartbeat_staleness: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            failure_limit: 10,
            heartbeat_staleness: Duration::from_secs(5 * 60),
        }
    }
}
