//! Events delivered to the controller.

use crate::detector::{DetectorKind, MissKind};
use standby_types::{MembershipState, ProductionState};

/// All possible inputs to the [`Controller`](crate::Controller).
///
/// Detector signals arrive on dedicated channels and are converted into
/// these by the runner. Completions of actions the controller requested
/// (`PauseCompleted`, `ResumeCompleted`, the refresh results) are fed back
/// the same way, so every state change goes through `handle()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// A second instance signed with the protected key; the primary is back.
    RestoreDetected,

    /// A detector believes the protected producer is missing.
    MissDetected {
        kind: MissKind,
        /// Whether the latest observation says the node is synced.
        chain_synced: bool,
    },

    /// Liveness signal from a worker.
    Heartbeat { detector: DetectorKind },

    /// A worker failed to query the node or read its input.
    DetectorFailed {
        detector: DetectorKind,
        reason: String,
    },

    /// Periodic housekeeping tick.
    Tick,

    /// Latest membership from the schedule tracker.
    MembershipRefreshed { membership: MembershipState },

    /// Production state as reported by the node.
    ProductionRefreshed { state: ProductionState },

    /// Result of a requested pause.
    PauseCompleted { result: Result<(), String> },

    /// Result of a requested resume.
    ResumeCompleted { result: Result<(), String> },
}

impl ControlEvent {
    /// Short name for log spans.
    pub fn type_name(&self) -> &'static str {
        match self {
            ControlEvent::RestoreDetected => "RestoreDetected",
            ControlEvent::MissDetected { .. } => "MissDetected",
            ControlEvent::Heartbeat { .. } => "Heartbeat",
            ControlEvent::DetectorFailed { .. } => "DetectorFailed",
            ControlEvent::Tick => "Tick",
            ControlEvent::MembershipRefreshed { .. } => "MembershipRefreshed",
            ControlEvent::ProductionRefreshed { .. } => "ProductionRefreshed",
            ControlEvent::PauseCompleted { .. } => "PauseCompleted",
            ControlEvent::ResumeCompleted { .. } => "ResumeCompleted",
        }
    }
}
