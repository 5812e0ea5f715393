//! Channels carrying detector output to the controller loop.
//!
//! ```text
//! Poller ─────────┐
//! Schedule ───────┤ heartbeat / failure
//! Missed blocks ──┼────────────────────────→ controller loop
//! Missed rounds ──┤ miss
//! Log watcher ────┘ restore
//! ```
//!
//! Each kind of signal has its own bounded channel so a burst of one kind
//! never starves another inside `tokio::select!`.

use standby_core::{DetectorKind, MissKind};
use std::fmt::Display;
use thiserror::Error;
use tokio::sync::mpsc;

/// The controller loop is gone. Workers stop when they see this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("controller loop has stopped")]
pub struct ControllerGone;

/// A failed check reported by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorFailure {
    pub detector: DetectorKind,
    pub reason: String,
}

/// Sending half, cloned into every worker.
#[derive(Debug, Clone)]
pub struct DetectorSignals {
    heartbeat: mpsc::Sender<DetectorKind>,
    miss: mpsc::Sender<MissKind>,
    restore: mpsc::Sender<()>,
    failure: mpsc::Sender<DetectorFailure>,
}

/// Receiving half, owned by the controller loop.
#[derive(Debug)]
pub struct SignalReceivers {
    pub heartbeat: mpsc::Receiver<DetectorKind>,
    pub miss: mpsc::Receiver<MissKind>,
    pub restore: mpsc::Receiver<()>,
    pub failure: mpsc::Receiver<DetectorFailure>,
}

/// Create the four signal channels with the given capacity each.
pub fn signal_channels(capacity: usize) -> (DetectorSignals, SignalReceivers) {
    let capacity = capacity.max(1);
    let (heartbeat_tx, heartbeat_rx) = mpsc::channel(capacity);
    let (miss_tx, miss_rx) = mpsc::channel(capacity);
    let (restore_tx, restore_rx) = mpsc::channel(capacity);
    let (failure_tx, failure_rx) = mpsc::channel(capacity);

    (
        DetectorSignals {
            heartbeat: heartbeat_tx,
            miss: miss_tx,
            restore: restore_tx,
            failure: failure_tx,
        },
        SignalReceivers {
            heartbeat: heartbeat_rx,
            miss: miss_rx,
            restore: restore_rx,
            failure: failure_rx,
        },
    )
}

impl DetectorSignals {
    pub async fn heartbeat(&self, detector: DetectorKind) -> Result<(), ControllerGone> {
        self.heartbeat.send(detector).await.map_err(|_| ControllerGone)
    }

    pub async fn miss(&self, kind: MissKind) -> Result<(), ControllerGone> {
        self.miss.send(kind).await.map_err(|_| ControllerGone)
    }

    pub async fn restore(&self) -> Result<(), ControllerGone> {
        self.restore.send(()).await.map_err(|_| ControllerGone)
    }

    pub async fn failure(
        &self,
        detector: DetectorKind,
        reason: impl Display,
    ) -> Result<(), ControllerGone> {
        self.failure
            .send(DetectorFailure {
                detector,
                reason: reason.to_string(),
            })
            .await
            .map_err(|_| ControllerGone)
    }
}
