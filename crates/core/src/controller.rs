//! Arbitration state machine.

use crate::action::{Action, Alert, FatalError};
use crate::config::ControllerConfig;
use crate::detector::{DetectorKind, MissKind};
use crate::health::HealthRegistry;
use crate::input::ControlEvent;
use crate::traits::StateMachine;
use chrono::{DateTime, Utc};
use standby_types::{MembershipState, ProductionState};
use tracing::{debug, error, info, instrument, warn};

/// A pause or resume the runner is currently executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Pausing,
    Resuming,
}

/// Single-writer failover controller.
///
/// Owns the production state, membership, failure counter and heartbeat
/// registry. Detectors only ever send events; every decision to pause,
/// resume or exit is made here.
///
/// Production state starts as [`ProductionState::Paused`]. The runner forces
/// the node into that state before the first event is handled.
pub struct Controller {
    config: ControllerConfig,
    now: DateTime<Utc>,
    production: ProductionState,
    membership: MembershipState,
    transition: Option<Transition>,
    failures: u32,
    health: HealthRegistry,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("production", &self.production)
            .field("membership", &self.membership)
            .field("transition", &self.transition)
            .field("failures", &self.failures)
            .finish()
    }
}

impl Controller {
    pub fn new(config: ControllerConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            now,
            production: ProductionState::Paused,
            membership: MembershipState::NotInActiveSet,
            transition: None,
            failures: 0,
            health: HealthRegistry::new(),
        }
    }

    /// Seed the membership computed during startup.
    pub fn with_membership(mut self, membership: MembershipState) -> Self {
        self.membership = membership;
        self
    }

    pub fn production(&self) -> ProductionState {
        self.production
    }

    pub fn membership(&self) -> MembershipState {
        self.membership
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    /// Whether a pause or resume is in flight.
    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    fn on_restore(&mut self) -> Vec<Action> {
        if self.transition.is_some() || self.production.is_paused() {
            debug!(
                production = %self.production,
                "Duplicate signature seen while not producing, ignoring"
            );
            return vec![];
        }
        info!("Duplicate signature detected, primary producer is back; pausing");
        self.transition = Some(Transition::Pausing);
        vec![Action::PauseProduction]
    }

    fn on_miss(&mut self, kind: MissKind, chain_synced: bool) -> Vec<Action> {
        if !self.membership.is_member() {
            debug!(%kind, "Producer is not in the active set, not resuming");
            return vec![];
        }
        if self.transition.is_some() || !self.production.is_paused() {
            return vec![];
        }
        if !chain_synced {
            warn!(%kind, "Miss reported but the node is not synced, not resuming");
            return vec![];
        }
        info!(%kind, "Producer is missing, resuming standby production");
        self.transition = Some(Transition::Resuming);
        vec![Action::ResumeProduction]
    }

    fn on_pause_completed(&mut self, result: Result<(), String>) -> Vec<Action> {
        self.transition = None;
        match result {
            Ok(()) => {
                self.production = ProductionState::Paused;
                info!("Standby production paused");
                vec![
                    Action::PublishProductionState(self.production),
                    Action::Alert(Alert::resolve(
                        "standby producer shutting down, primary is back",
                    )),
                ]
            }
            Err(e) => {
                error!(error = %e, "Could not pause standby production");
                vec![Action::Alert(Alert::trigger(format!(
                    "standby producer could not stop production: {e}"
                )))]
            }
        }
    }

    fn on_resume_completed(&mut self, result: Result<(), String>) -> Vec<Action> {
        self.transition = None;
        match result {
            Ok(()) => {
                self.production = ProductionState::Active;
                info!("Standby production enabled");
                vec![
                    Action::PublishProductionState(self.production),
                    Action::Alert(Alert::trigger("standby enabled block production")),
                ]
            }
            Err(e) => {
                self.production = ProductionState::Paused;
                error!(error = %e, "Could not resume producer");
                vec![Action::Alert(Alert::trigger(format!(
                    "could not resume producer: {e}"
                )))]
            }
        }
    }

    fn on_failure(&mut self, detector: DetectorKind, reason: String) -> Vec<Action> {
        self.failures += 1;
        warn!(%detector, failures = self.failures, error = %reason, "Detector check failed");
        if self.failures > self.config.failure_limit {
            error!(failures = self.failures, "Too many failed checks, exiting");
            return vec![Action::Exit(FatalError::TooManyFailures {
                count: self.failures,
                last: reason,
            })];
        }
        vec![]
    }

    fn on_tick(&mut self) -> Vec<Action> {
        if let Some((detector, silent_for)) = self
            .health
            .stale(self.now, self.config.heartbeat_staleness)
        {
            error!(%detector, ?silent_for, "Detector stopped sending heartbeats, exiting");
            return vec![Action::Exit(FatalError::DetectorStale {
                detector,
                silent_for,
            })];
        }
        vec![Action::RefreshState]
    }

    fn on_production_refreshed(&mut self, state: ProductionState) -> Vec<Action> {
        // The node's answer may predate an in-flight pause or resume.
        if self.transition.is_some() || state == self.production {
            return vec![];
        }
        warn!(
            was = %self.production,
            now = %state,
            "Node production state changed outside the controller"
        );
        self.production = state;
        vec![Action::PublishProductionState(state)]
    }
}

impl StateMachine for Controller {
    type Event = ControlEvent;
    type Action = Action;

    #[instrument(skip(self), fields(
        event = %event.type_name(),
        production = %self.production,
    ))]
    fn handle(&mut self, event: ControlEvent) -> Vec<Action> {
        match event {
            ControlEvent::RestoreDetected => self.on_restore(),
            ControlEvent::MissDetected { kind, chain_synced } => self.on_miss(kind, chain_synced),
            ControlEvent::Heartbeat { detector } => {
                self.failures = 0;
                self.health.record(detector, self.now);
                vec![]
            }
            ControlEvent::DetectorFailed { detector, reason } => self.on_failure(detector, reason),
            ControlEvent::Tick => self.on_tick(),
            ControlEvent::MembershipRefreshed { membership } => {
                if membership != self.membership {
                    info!(?membership, "Active set membership changed");
                }
                self.membership = membership;
                vec![]
            }
            ControlEvent::ProductionRefreshed { state } => self.on_production_refreshed(state),
            ControlEvent::PauseCompleted { result } => self.on_pause_completed(result),
            ControlEvent::ResumeCompleted { result } => self.on_resume_completed(result),
        }
    }

    fn set_time(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
