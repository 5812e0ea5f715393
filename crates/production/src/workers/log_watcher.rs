//! Duplicate-signature log watcher.

use crate::log_tail::TailEvent;
use crate::signals::{ControllerGone, DetectorSignals};
use chrono::Utc;
use standby_core::{DetectorKind, DuplicateSignatureMatcher, LogActivity};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Consume tailed log lines and raise a restore signal on every duplicate
/// signature by the protected producer.
///
/// Heartbeats once per `heartbeat_period`, but only if a line arrived within
/// that window. If the tail task stops, a failure is reported on each
/// heartbeat tick instead.
pub async fn run_log_watcher(
    matcher: DuplicateSignatureMatcher,
    mut lines: mpsc::Receiver<TailEvent>,
    signals: DetectorSignals,
    heartbeat_period: Duration,
) -> Result<(), ControllerGone> {
    let mut activity = LogActivity::new(heartbeat_period);
    let mut heartbeat = interval_at(Instant::now() + heartbeat_period, heartbeat_period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tail_alive = true;

    loop {
        tokio::select! {
            event = lines.recv(), if tail_alive => match event {
                Some(TailEvent::Line { line, received_at }) => {
                    activity.line_received(received_at);
                    if matcher.is_duplicate(&line) {
                        info!(line = %line, "Protected producer signed a duplicate block");
                        signals.restore().await?;
                    }
                }
                Some(TailEvent::Failed(e)) => {
                    signals.failure(DetectorKind::LogWatcher, e).await?;
                }
                None => {
                    warn!("Log tail stopped");
                    tail_alive = false;
                }
            },
            _ = heartbeat.tick() => {
                if !tail_alive {
                    signals.failure(DetectorKind::LogWatcher, "log watcher died").await?;
                } else if activity.is_alive(Utc::now()) {
                    signals.heartbeat(DetectorKind::LogWatcher).await?;
                }
            }
        }
    }
}
