//! Missed round worker.

use super::ticker;
use crate::signals::{ControllerGone, DetectorSignals};
use crate::snapshot::SharedObservation;
use chrono::Utc;
use standby_core::{DetectorKind, MissKind, MissedRoundDetector, RoundCheck};
use standby_rpc::ChainNode;
use standby_types::{BlockObservation, ProductionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Drive a [`MissedRoundDetector`] once per `period`.
#[allow(clippy::too_many_arguments)]
pub async fn run_missed_rounds(
    node: Arc<dyn ChainNode>,
    mut detector: MissedRoundDetector,
    observation: SharedObservation,
    production: watch::Receiver<ProductionState>,
    signals: DetectorSignals,
    period: Duration,
    startup_wait: Duration,
    sync_threshold: Duration,
) -> Result<(), ControllerGone> {
    while observation.synced(Utc::now(), sync_threshold).is_none() {
        debug!("Missed round detection not started, waiting for data");
        tokio::time::sleep(startup_wait).await;
    }
    info!("Watching for missed rounds");

    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        signals.heartbeat(DetectorKind::MissedRounds).await?;

        if !production.borrow().is_paused() {
            continue;
        }
        let Some(obs) = observation.load() else {
            continue;
        };
        if !detector.is_due(&obs) {
            continue;
        }

        match evaluate(node.as_ref(), &mut detector, &obs).await {
            Ok(true) => signals.miss(MissKind::MissedRound).await?,
            Ok(false) => {}
            Err(e) => signals.failure(DetectorKind::MissedRounds, e).await?,
        }
    }
}

/// One evaluation attempt. Returns whether a missed round was found.
async fn evaluate(
    node: &dyn ChainNode,
    detector: &mut MissedRoundDetector,
    obs: &BlockObservation,
) -> Result<bool, standby_rpc::RpcError> {
    let header = node.get_block_header_state(obs.block_num).await?;

    match detector.check_header(obs, &header, Utc::now()) {
        RoundCheck::Unavailable => Ok(false),
        RoundCheck::Complete { missed, .. } => Ok(missed),
        RoundCheck::NeedsBoundary { block_num } => {
            let boundary = node.get_block(block_num).await?;
            if !detector.boundary_observed(block_num, boundary.timestamp, Utc::now()) {
                return Ok(false);
            }
            match detector.check_header(obs, &header, Utc::now()) {
                RoundCheck::Complete { missed, .. } => Ok(missed),
                RoundCheck::Unavailable | RoundCheck::NeedsBoundary { .. } => Ok(false),
            }
        }
    }
}
