//! Runtime configuration for the runner and its workers.

use standby_core::{ControllerConfig, MissedBlockConfig, MissedRoundConfig};
use std::time::Duration;

/// How often each worker wakes up.
#[derive(Debug, Clone)]
pub struct WorkerIntervals {
    /// Chain info poller (default: 1s).
    pub poll: Duration,
    /// Schedule tracker (default: 1min).
    pub schedule: Duration,
    /// Missed block detector (default: 1s).
    pub missed_block: Duration,
    /// Missed round detector (default: 6s).
    pub missed_round: Duration,
    /// Log watcher heartbeat, also the window a log line counts as recent
    /// (default: 1min).
    pub log_heartbeat: Duration,
    /// How often the log file is checked for new data (default: 250ms).
    pub log_poll: Duration,
    /// Controller housekeeping tick (default: 1min).
    pub controller_tick: Duration,
    /// Delay between readiness checks while a detector waits for its first
    /// observation (default: 1s).
    pub startup_wait: Duration,
}

impl Default for WorkerIntervals {
    fn default() -> Self {
        Self {
            poll: Duration::from_secs(1),
            schedule: Duration::from_secs(60),
            missed_block: Duration::from_secs(1),
            missed_round: Duration::from_secs(6),
            log_heartbeat: Duration::from_secs(60),
            log_poll: Duration::from_millis(250),
            controller_tick: Duration::from_secs(60),
            startup_wait: Duration::from_secs(1),
        }
    }
}

/// Startup sequence timing.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Head must be at most this old before monitoring starts (default: 2min).
    pub sync_threshold: Duration,
    /// Wait after a failed `get_info` (default: 10s).
    pub error_retry: Duration,
    /// Wait while the node is still syncing (default: 1min).
    pub sync_retry: Duration,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            sync_threshold: Duration::from_secs(120),
            error_retry: Duration::from_secs(10),
            sync_retry: Duration::from_secs(60),
        }
    }
}

/// Everything the runner needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct StandbyConfig {
    pub missed_block: MissedBlockConfig,
    pub missed_round: MissedRoundConfig,
    pub controller: ControllerConfig,
    pub intervals: WorkerIntervals,
    pub startup: StartupConfig,
    /// Capacity of each detector signal channel (default: 64).
    pub channel_capacity: usize,
}

impl Default for StandbyConfig {
    fn default() -> Self {
        Self {
            missed_block: MissedBlockConfig::default(),
            missed_round: MissedRoundConfig::default(),
            controller: ControllerConfig::default(),
            intervals: WorkerIntervals::default(),
            startup: StartupConfig::default(),
            channel_capacity: 64,
        }
    }
}

impl StandbyConfig {
    /// Head age beyond which the chain is treated as unsynced when gating a
    /// failover.
    pub fn sync_threshold(&self) -> Duration {
        self.missed_block.sync_threshold
    }
}
