//! Actions emitted by the controller.

use crate::detector::DetectorKind;
use standby_types::ProductionState;
use std::time::Duration;
use thiserror::Error;

/// Work the runner must perform on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Call the node's pause endpoint, then report `PauseCompleted`.
    PauseProduction,

    /// Call the node's resume endpoint, then report `ResumeCompleted`.
    ResumeProduction,

    /// Re-read membership and production state, then report
    /// `MembershipRefreshed` and `ProductionRefreshed`.
    RefreshState,

    /// Publish the controller's production state to the detectors.
    PublishProductionState(ProductionState),

    /// Notify the operator.
    Alert(Alert),

    /// Terminate the process. The supervisor restarts it into a paused state.
    Exit(FatalError),
}

/// Whether an alert opens or closes an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    Trigger,
    Resolve,
}

/// An operator notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
}

impl Alert {
    pub fn trigger(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Trigger,
            message: message.into(),
        }
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        Self {
            severity: AlertSeverity::Resolve,
            message: message.into(),
        }
    }
}

/// Conditions under which monitoring can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("too many failed checks ({count}), last: {last}")]
    TooManyFailures { count: u32, last: String },

    #[error("{detector} routine hasn't sent a heartbeat for {silent_for:?}")]
    DetectorStale {
        detector: DetectorKind,
        silent_for: Duration,
    },
}
