//! Production runner.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────────────┐
//!  │  Tokio runtime (multi-threaded)                                      │
//!  │                                                                      │
//!  │  Worker tasks:                                                       │
//!  │    - Chain poller       (1s)  → SharedObservation                    │
//!  │    - Schedule tracker   (1m)  → SharedSchedule                       │
//!  │    - Missed blocks      (1s)  → miss channel                         │
//!  │    - Missed rounds      (6s)  → miss channel                         │
//!  │    - Log tail + watcher       → restore channel                      │
//!  │    all of them                → heartbeat / failure channels         │
//!  │                                                                      │
//!  │  Controller loop (this task):                                        │
//!  │    select! { restore, miss, heartbeat, failure, tick }               │
//!  │      → Controller::handle(event) → actions                           │
//!  │      → pause / resume / refresh against the node                     │
//!  │      → completions fed back as events                                │
//!  │      → ProductionState published on a watch channel                  │
//!  └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The runner has no graceful shutdown. It returns only when monitoring can
//! no longer be trusted, and the binary exits non-zero so the supervisor
//! restarts it into a paused state.

use crate::alerting::{AlertError, AlertSink, LoggingAlertSink, PagerDutyAlertSink};
use crate::config::StandbyConfig;
use crate::log_tail::{run_tail, LogTail, TailError};
use crate::signals::{signal_channels, SignalReceivers};
use crate::snapshot::{SharedObservation, SharedSchedule};
use crate::startup::{self, StartupError};
use crate::workers::{
    run_log_watcher, run_missed_blocks, run_missed_rounds, run_poller, ScheduleTracker,
};
use chrono::Utc;
use standby_core::{
    Action, ControlEvent, Controller, DetectorKind, DuplicateSignatureMatcher, FatalError,
    MissedBlockDetector, MissedRoundDetector, StateMachine,
};
use standby_rpc::ChainNode;
use standby_types::{MembershipState, ProducerName, ProductionState};
use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
// RunnerError
// ═══════════════════════════════════════════════════════════════════════════

/// Errors from the production runner.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Runner is missing its {0}")]
    MissingInput(&'static str),
    #[error("Startup failed: {0}")]
    Startup(#[from] StartupError),
    #[error("Log tail failed: {0}")]
    Tail(#[from] TailError),
    #[error("Alerting setup failed: {0}")]
    Alert(#[from] AlertError),
    #[error("Fatal: {0}")]
    Fatal(#[from] FatalError),
}

// ═══════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════

/// Builder for [`StandbyRunner`].
#[derive(Default)]
pub struct StandbyRunnerBuilder {
    node: Option<Arc<dyn ChainNode>>,
    producer: Option<ProducerName>,
    log_file: Option<PathBuf>,
    alert_sink: Option<Arc<dyn AlertSink>>,
    pagerduty_key: Option<String>,
    config: StandbyConfig,
}

impl StandbyRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node to monitor and control (required).
    pub fn node(mut self, node: Arc<dyn ChainNode>) -> Self {
        self.node = Some(node);
        self
    }

    /// Producer account to keep online (required).
    pub fn producer(mut self, producer: ProducerName) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Node log to watch for duplicate signatures (required).
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Send alerts to PagerDuty with this routing key.
    pub fn pagerduty_key(mut self, key: Option<String>) -> Self {
        self.pagerduty_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Use a specific alert sink, overriding the PagerDuty key.
    pub fn alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alert_sink = Some(sink);
        self
    }

    pub fn config(mut self, config: StandbyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<StandbyRunner, RunnerError> {
        Ok(StandbyRunner {
            node: self.node.ok_or(RunnerError::MissingInput("chain node"))?,
            producer: self.producer.ok_or(RunnerError::MissingInput("producer"))?,
            log_file: self.log_file.ok_or(RunnerError::MissingInput("log file"))?,
            alert_sink: self.alert_sink,
            pagerduty_key: self.pagerduty_key,
            config: self.config,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// StandbyRunner
// ═══════════════════════════════════════════════════════════════════════════

/// Owns the collaborators and runs startup, the workers and the controller
/// loop.
pub struct StandbyRunner {
    node: Arc<dyn ChainNode>,
    producer: ProducerName,
    log_file: PathBuf,
    alert_sink: Option<Arc<dyn AlertSink>>,
    pagerduty_key: Option<String>,
    config: StandbyConfig,
}

impl StandbyRunner {
    pub fn builder() -> StandbyRunnerBuilder {
        StandbyRunnerBuilder::new()
    }

    pub fn producer(&self) -> &ProducerName {
        &self.producer
    }

    /// Run until a fatal condition. Never returns `Ok`.
    pub async fn run(self) -> Result<(), RunnerError> {
        let config = self.config;
        let intervals = config.intervals.clone();

        let report =
            startup::prepare(self.node.as_ref(), &self.log_file, &config.startup).await?;
        info!(
            producer = %self.producer,
            network = report.network,
            head_block_num = report.head.head_block_num,
            was_producing = report.was_producing,
            "Startup complete, production is paused"
        );

        let alerts: Arc<dyn AlertSink> = match (self.alert_sink, self.pagerduty_key) {
            (Some(sink), _) => sink,
            (None, Some(key)) => Arc::new(PagerDutyAlertSink::new(
                key,
                self.producer.as_str(),
                report.network,
            )?),
            (None, None) => Arc::new(LoggingAlertSink::new(
                self.producer.as_str(),
                report.network,
            )),
        };

        let tail = LogTail::open(&self.log_file).await?;
        let observation = SharedObservation::new();
        let schedule = SharedSchedule::new();
        let (signals, receivers) = signal_channels(config.channel_capacity);
        let (production_tx, production_rx) = watch::channel(ProductionState::Paused);

        let tracker =
            ScheduleTracker::new(self.node.clone(), self.producer.clone(), schedule.clone());
        let mut pending = VecDeque::new();
        let membership = match tracker.refresh().await {
            Ok(view) => view.membership,
            Err(e) => {
                warn!(error = %e, "Initial schedule refresh failed");
                pending.push_back(ControlEvent::DetectorFailed {
                    detector: DetectorKind::Schedule,
                    reason: e.to_string(),
                });
                MembershipState::NotInActiveSet
            }
        };
        info!(membership = ?membership, "Initial active set membership");

        let mut workers = JoinSet::new();
        spawn_worker(
            &mut workers,
            "poller",
            run_poller(
                self.node.clone(),
                observation.clone(),
                signals.clone(),
                intervals.poll,
            ),
        );
        spawn_worker(
            &mut workers,
            "schedule",
            tracker.run(signals.clone(), intervals.schedule),
        );
        spawn_worker(
            &mut workers,
            "missed blocks",
            run_missed_blocks(
                MissedBlockDetector::new(self.producer.clone(), &config.missed_block),
                observation.clone(),
                schedule.clone(),
                production_rx.clone(),
                signals.clone(),
                intervals.missed_block,
                intervals.startup_wait,
                config.missed_block.sync_threshold,
            ),
        );
        spawn_worker(
            &mut workers,
            "missed rounds",
            run_missed_rounds(
                self.node.clone(),
                MissedRoundDetector::new(self.producer.clone(), config.missed_round.clone()),
                observation.clone(),
                production_rx,
                signals.clone(),
                intervals.missed_round,
                intervals.startup_wait,
                config.missed_round.sync_threshold,
            ),
        );

        let (tail_tx, tail_rx) = mpsc::channel(config.channel_capacity.max(1));
        workers.spawn(run_tail(
            self.log_file.clone(),
            Some(tail),
            intervals.log_poll,
            tail_tx,
        ));
        spawn_worker(
            &mut workers,
            "log watcher",
            run_log_watcher(
                DuplicateSignatureMatcher::new(self.producer.clone()),
                tail_rx,
                signals,
                intervals.log_heartbeat,
            ),
        );

        let controller =
            Controller::new(config.controller.clone(), Utc::now()).with_membership(membership);
        let mut control = ControlLoop {
            controller,
            node: self.node,
            alerts,
            production_tx,
            observation,
            schedule,
            sync_threshold: config.sync_threshold(),
        };

        let result = control
            .run(receivers, pending, intervals.controller_tick)
            .await;
        workers.abort_all();
        result
    }
}

fn spawn_worker<F, E>(workers: &mut JoinSet<()>, name: &'static str, worker: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display,
{
    workers.spawn(async move {
        if let Err(e) = worker.await {
            debug!(worker = name, error = %e, "Worker stopped");
        }
    });
}

// ═══════════════════════════════════════════════════════════════════════════
// ControlLoop
// ═══════════════════════════════════════════════════════════════════════════

/// Drives the [`Controller`] and performs its actions.
struct ControlLoop {
    controller: Controller,
    node: Arc<dyn ChainNode>,
    alerts: Arc<dyn AlertSink>,
    production_tx: watch::Sender<ProductionState>,
    observation: SharedObservation,
    schedule: SharedSchedule,
    sync_threshold: Duration,
}

impl ControlLoop {
    async fn run(
        &mut self,
        mut rx: SignalReceivers,
        initial: VecDeque<ControlEvent>,
        tick_period: Duration,
    ) -> Result<(), RunnerError> {
        let mut tick = interval_at(Instant::now() + tick_period, tick_period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.dispatch(initial).await?;

        loop {
            let event = tokio::select! {
                Some(()) = rx.restore.recv() => ControlEvent::RestoreDetected,
                Some(kind) = rx.miss.recv() => ControlEvent::MissDetected {
                    kind,
                    chain_synced: self.chain_synced(),
                },
                Some(detector) = rx.heartbeat.recv() => ControlEvent::Heartbeat { detector },
                Some(failure) = rx.failure.recv() => ControlEvent::DetectorFailed {
                    detector: failure.detector,
                    reason: failure.reason,
                },
                _ = tick.tick() => ControlEvent::Tick,
            };
            self.dispatch(VecDeque::from([event])).await?;
        }
    }

    fn chain_synced(&self) -> bool {
        self.observation
            .synced(Utc::now(), self.sync_threshold)
            .is_some()
    }

    /// Handle `events` and every completion they lead to.
    async fn dispatch(&mut self, mut events: VecDeque<ControlEvent>) -> Result<(), RunnerError> {
        while let Some(event) = events.pop_front() {
            self.controller.set_time(Utc::now());
            for action in self.controller.handle(event) {
                self.execute(action, &mut events).await?;
            }
        }
        Ok(())
    }

    async fn execute(
        &mut self,
        action: Action,
        follow_up: &mut VecDeque<ControlEvent>,
    ) -> Result<(), RunnerError> {
        match action {
            Action::PauseProduction => {
                let result = self.node.pause_producer().await.map_err(|e| e.to_string());
                follow_up.push_back(ControlEvent::PauseCompleted { result });
            }
            Action::ResumeProduction => {
                let result = self.node.resume_producer().await.map_err(|e| e.to_string());
                follow_up.push_back(ControlEvent::ResumeCompleted { result });
            }
            Action::RefreshState => {
                follow_up.push_back(ControlEvent::MembershipRefreshed {
                    membership: self.schedule.load().membership,
                });
                match self.node.is_producer_paused().await {
                    Ok(paused) => follow_up.push_back(ControlEvent::ProductionRefreshed {
                        state: ProductionState::from_paused(paused),
                    }),
                    Err(e) => follow_up.push_back(ControlEvent::DetectorFailed {
                        detector: DetectorKind::Schedule,
                        reason: format!("production state query failed: {e}"),
                    }),
                }
            }
            Action::PublishProductionState(state) => {
                self.production_tx.send_replace(state);
            }
            Action::Alert(alert) => self.alerts.notify(&alert),
            Action::Exit(fatal) => return Err(RunnerError::Fatal(fatal)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standby_test_helpers::{producer, MockChainNode};

    #[test]
    fn test_builder_requires_inputs() {
        let err = StandbyRunner::builder()
            .producer(producer("bbbbbbbbbbbb"))
            .log_file("/tmp/nodeos.log")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RunnerError::MissingInput("chain node")));

        let runner = StandbyRunner::builder()
            .node(Arc::new(MockChainNode::new()))
            .producer(producer("bbbbbbbbbbbb"))
            .log_file("/tmp/nodeos.log")
            .pagerduty_key(Some(String::new()))
            .build()
            .unwrap();
        assert_eq!(runner.producer().as_str(), "bbbbbbbbbbbb");
        assert!(runner.pagerduty_key.is_none());
    }
}
