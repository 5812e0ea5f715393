//! Missed block worker.

use super::ticker;
use crate::signals::{ControllerGone, DetectorSignals};
use crate::snapshot::{SharedObservation, SharedSchedule};
use chrono::Utc;
use standby_core::{DetectorKind, MissedBlockDetector};
use standby_types::ProductionState;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Drive a [`MissedBlockDetector`] once per `period`.
///
/// Waits until neighbors and a synced observation exist, then heartbeats on
/// every tick. Evaluation happens only while production is paused; while
/// active the detector is reset.
#[allow(clippy::too_many_arguments)]
pub async fn run_missed_blocks(
    mut detector: MissedBlockDetector,
    observation: SharedObservation,
    schedule: SharedSchedule,
    production: watch::Receiver<ProductionState>,
    signals: DetectorSignals,
    period: Duration,
    startup_wait: Duration,
    sync_threshold: Duration,
) -> Result<(), ControllerGone> {
    loop {
        let ready = schedule.load().neighbors.is_some()
            && observation.synced(Utc::now(), sync_threshold).is_some();
        if ready {
            break;
        }
        debug!("Missed block detection not started, waiting for data");
        tokio::time::sleep(startup_wait).await;
    }
    info!("Watching for missed blocks");

    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        signals.heartbeat(DetectorKind::MissedBlocks).await?;

        if !production.borrow().is_paused() {
            detector.reset();
            continue;
        }
        let Some(obs) = observation.synced(Utc::now(), sync_threshold) else {
            continue;
        };
        let Some(neighbors) = schedule.load().neighbors.clone() else {
            continue;
        };

        if let Some(kind) = detector.observe(&obs, &neighbors) {
            signals.miss(kind).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal_channels;
    use standby_core::{MissKind, MissedBlockConfig};
    use standby_test_helpers::{neighbors, observation, producer};
    use standby_types::{MembershipState, ScheduleView};

    const A: &str = "aaaaaaaaaaaa";
    const C: &str = "cccccccccccc";

    fn member_schedule() -> SharedSchedule {
        let schedule = SharedSchedule::new();
        schedule.publish(ScheduleView {
            version: 1,
            membership: MembershipState::InActiveSet,
            neighbors: Some(neighbors(A, C)),
        });
        schedule
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_head_after_predecessor_signals_miss() {
        let obs = SharedObservation::new();
        obs.publish(observation(100, A));
        let (_production_tx, production_rx) = watch::channel(ProductionState::Paused);
        let (signals, mut rx) = signal_channels(16);

        let task = tokio::spawn(run_missed_blocks(
            MissedBlockDetector::new(producer("bbbbbbbbbbbb"), &MissedBlockConfig::default()),
            obs.clone(),
            member_schedule(),
            production_rx,
            signals,
            Duration::from_millis(5),
            Duration::from_millis(5),
            Duration::from_secs(60),
        ));

        let kind = tokio::time::timeout(Duration::from_secs(5), rx.miss.recv())
            .await
            .unwrap();
        assert_eq!(kind, Some(MissKind::StalledHead));
        assert_eq!(rx.heartbeat.recv().await, Some(DetectorKind::MissedBlocks));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_production_suppresses_detection() {
        let obs = SharedObservation::new();
        obs.publish(observation(100, A));
        let (_production_tx, production_rx) = watch::channel(ProductionState::Active);
        let (signals, mut rx) = signal_channels(64);

        let task = tokio::spawn(run_missed_blocks(
            MissedBlockDetector::new(producer("bbbbbbbbbbbb"), &MissedBlockConfig::default()),
            obs,
            member_schedule(),
            production_rx,
            signals,
            Duration::from_millis(5),
            Duration::from_millis(5),
            Duration::from_secs(60),
        ));

        for _ in 0..10 {
            assert_eq!(rx.heartbeat.recv().await, Some(DetectorKind::MissedBlocks));
        }
        assert!(rx.miss.try_recv().is_err());
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_neighbors_before_heartbeating() {
        let obs = SharedObservation::new();
        obs.publish(observation(100, A));
        let (_production_tx, production_rx) = watch::channel(ProductionState::Paused);
        let (signals, mut rx) = signal_channels(16);
        let schedule = SharedSchedule::new();

        let task = tokio::spawn(run_missed_blocks(
            MissedBlockDetector::new(producer("bbbbbbbbbbbb"), &MissedBlockConfig::default()),
            obs,
            schedule.clone(),
            production_rx,
            signals,
            Duration::from_millis(5),
            Duration::from_millis(5),
            Duration::from_secs(60),
        ));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.heartbeat.try_recv().is_err());

        schedule.publish(member_schedule().load().as_ref().clone());
        let beat = tokio::time::timeout(Duration::from_secs(5), rx.heartbeat.recv())
            .await
            .unwrap();
        assert_eq!(beat, Some(DetectorKind::MissedBlocks));
        task.abort();
    }
}
