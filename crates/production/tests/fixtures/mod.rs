//! Test fixtures for production e2e tests.
//!
//! Provides a scripted node, a temporary node log, a recording alert sink
//! and a configuration with intervals short enough for tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use standby_core::{Alert, AlertSeverity};
use standby_production::{AlertSink, RunnerError, StandbyConfig, StandbyRunner};
use standby_test_helpers::{producer, MockChainNode};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Account the monitor protects in every scenario.
pub const PROTECTED: &str = "bbbbbbbbbbbb";
/// Producer immediately before [`PROTECTED`] in name order.
pub const BEFORE: &str = "aaaaaaaaaaaa";
/// Producer immediately after [`PROTECTED`] in name order.
pub const AFTER: &str = "cccccccccccc";

/// Collects alerts instead of delivering them.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn count(&self, severity: AlertSeverity) -> usize {
        self.alerts
            .lock()
            .iter()
            .filter(|a| a.severity == severity)
            .count()
    }
}

impl AlertSink for RecordingAlertSink {
    fn notify(&self, alert: &Alert) {
        self.alerts.lock().push(alert.clone());
    }
}

/// Millisecond-scale timing so scenarios finish quickly.
pub fn fast_config() -> StandbyConfig {
    let mut config = StandbyConfig::default();
    config.intervals.poll = Duration::from_millis(10);
    config.intervals.schedule = Duration::from_secs(10);
    config.intervals.missed_block = Duration::from_millis(20);
    config.intervals.missed_round = Duration::from_millis(20);
    config.intervals.log_heartbeat = Duration::from_secs(1);
    config.intervals.log_poll = Duration::from_millis(10);
    config.intervals.controller_tick = Duration::from_millis(50);
    config.intervals.startup_wait = Duration::from_millis(10);
    config.startup.error_retry = Duration::from_millis(10);
    config.startup.sync_retry = Duration::from_millis(10);
    config
}

/// A runner wired to a mock node, a temporary log and a recording sink.
pub struct TestHarness {
    pub node: Arc<MockChainNode>,
    pub alerts: Arc<RecordingAlertSink>,
    pub log: tempfile::NamedTempFile,
}

impl TestHarness {
    /// A paused node on a fresh head whose schedule is
    /// `[BEFORE, PROTECTED, AFTER]`.
    pub fn new() -> Self {
        let node = Arc::new(MockChainNode::new());
        node.set_schedule(&[BEFORE, PROTECTED, AFTER], 1);

        let mut log = tempfile::NamedTempFile::new().expect("temp log");
        writeln!(log, "info  nodeos started").expect("write log");

        Self {
            node,
            alerts: Arc::new(RecordingAlertSink::default()),
            log,
        }
    }

    /// Spawn the runner with `config`.
    pub fn spawn(&self, config: StandbyConfig) -> JoinHandle<Result<(), RunnerError>> {
        let runner = StandbyRunner::builder()
            .node(self.node.clone())
            .producer(producer(PROTECTED))
            .log_file(self.log.path())
            .alert_sink(self.alerts.clone())
            .config(config)
            .build()
            .expect("runner");
        tokio::spawn(runner.run())
    }

    /// Append `line` to the node log.
    pub fn append_log(&self, line: &str) {
        append(self.log.path(), line);
    }
}

pub fn append(path: &Path, line: &str) {
    let mut f = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open log");
    writeln!(f, "{line}").expect("append log");
    f.flush().expect("flush log");
}

/// The line nodeos writes when it rejects a block signed by `producer`.
pub fn duplicate_signature_line(block_num: u32, producer: &str) -> String {
    format!(
        "error 2024-05-01T12:00:00.500 nodeos    controller.cpp:2100      \
         push_block ] Block not applied to head 0a1b2c #{block_num} signed by {producer}"
    )
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
