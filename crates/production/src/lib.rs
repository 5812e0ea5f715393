//! Production runner with async I/O.
//!
//! This crate wraps the deterministic detectors and controller from
//! `standby-core` with real I/O against a running node:
//!
//! - Chain polling and schedule tracking via the node's HTTP API
//! - Log tailing for duplicate-signature lines
//! - Timers via tokio intervals
//! - Operator alerts via PagerDuty
//!
//! # Architecture
//!
//! Each detector runs as its own task and reports to the controller over
//! bounded channels. A single task owns the [`Controller`](standby_core::Controller)
//! and is the only caller of the pause and resume endpoints, so the
//! production state has exactly one writer.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Standby monitor                                 │
//! │                                                                         │
//! │   poller ──→ SharedObservation ──┬──→ missed blocks ──┐                 │
//! │   schedule ─→ SharedSchedule ────┘    missed rounds ──┤ miss            │
//! │   log tail ──→ log watcher ───────────────────────────┤ restore         │
//! │                                   all ────────────────┤ heartbeat/fail  │
//! │                                                       ▼                 │
//! │                                         StandbyRunner (controller loop) │
//! │                                           │           │                 │
//! │                              pause/resume ▼           ▼ watch           │
//! │                                         node      ProductionState       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use standby_production::{StandbyConfig, StandbyRunner};
//! use standby_rpc::HttpChainNode;
//! use standby_types::ProducerName;
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let runner = StandbyRunner::builder()
//!     .node(Arc::new(HttpChainNode::new("http://127.0.0.1:8888")?))
//!     .producer(ProducerName::new("bpaccount111")?)
//!     .log_file("/var/log/fio/nodeos.log")
//!     .config(StandbyConfig::default())
//!     .build()?;
//! runner.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod alerting;
mod config;
pub mod log_tail;
mod runner;
mod signals;
mod snapshot;
pub mod startup;
pub mod telemetry;
pub mod workers;

pub use alerting::{AlertError, AlertSink, LoggingAlertSink, PagerDutyAlertSink};
pub use config::{StandbyConfig, StartupConfig, WorkerIntervals};
pub use log_tail::{LogTail, TailError, TailEvent};
pub use runner::{RunnerError, StandbyRunner, StandbyRunnerBuilder};
pub use signals::{signal_channels, ControllerGone, DetectorFailure, DetectorSignals, SignalReceivers};
pub use snapshot::{SharedObservation, SharedSchedule};
pub use startup::{StartupError, StartupReport};
pub use telemetry::{init_logging, TelemetryError};
