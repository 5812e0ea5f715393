//! Standby block producer monitor.
//!
//! Watches a paused `nodeos` for signs that the primary instance of the same
//! producer has stopped signing, resumes production when it has, and pauses
//! again as soon as the primary is back.
//!
//! # Usage
//!
//! ```bash
//! bp-standby --account bpaccount111 --log-file /var/log/fio/nodeos.log
//! ```
//!
//! Chain constants and worker timing can be tuned with `--config tuning.toml`:
//!
//! ```toml
//! [node]
//! url = "http://127.0.0.1:8888"
//!
//! [detection]
//! active_producers = 21
//! blocks_per_round = 13
//!
//! [controller]
//! failure_limit = 10
//! heartbeat_staleness_secs = 300
//! ```
//!
//! The process never shuts down on its own while healthy. It exits with
//! status 1 when monitoring can no longer be trusted; run it under a
//! supervisor that restarts it.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use standby_core::{ControllerConfig, MissedBlockConfig, MissedRoundConfig};
use standby_production::{
    init_logging, StandbyConfig, StandbyRunner, StartupConfig, WorkerIntervals,
};
use standby_rpc::{HttpChainNode, DEFAULT_NODE_URL};
use standby_types::ProducerName;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "bp-standby")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node HTTP API URL [default: http://127.0.0.1:8888]
    #[arg(short, long)]
    url: Option<String>,

    /// Producer account to keep online
    #[arg(short, long)]
    account: String,

    /// Node log file to watch for duplicate signatures
    /// [default: /var/log/fio/nodeos.log]
    #[arg(short = 'f', long)]
    log_file: Option<PathBuf>,

    /// PagerDuty routing key (alerts go to the log only if unset)
    #[arg(long)]
    pager: Option<String>,

    /// Path to tuning file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Where this process writes its own logs (stdout if unset)
    #[arg(long)]
    output_log: Option<PathBuf>,
}

/// Top-level tuning file.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    node: NodeSection,

    #[serde(default)]
    detection: DetectionSection,

    #[serde(default)]
    controller: ControllerSection,

    #[serde(default)]
    intervals: IntervalSection,

    #[serde(default)]
    startup: StartupSection,

    #[serde(default)]
    alerting: AlertingSection,

    #[serde(default)]
    telemetry: TelemetrySection,
}

#[derive(Debug, Clone, Deserialize)]
struct NodeSection {
    #[serde(default = "default_url")]
    url: String,

    #[serde(default = "default_log_file")]
    log_file: PathBuf,

    /// RPC request timeout.
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            log_file: default_log_file(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_url() -> String {
    DEFAULT_NODE_URL.to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/fio/nodeos.log")
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Chain constants and detector thresholds.
#[derive(Debug, Clone, Deserialize)]
struct DetectionSection {
    #[serde(default = "default_stalled_ticks")]
    stalled_ticks: u32,

    /// Head age beyond which detectors stay dormant.
    #[serde(default = "default_sync_threshold_secs")]
    sync_threshold_secs: u64,

    #[serde(default = "default_active_producers")]
    active_producers: u32,

    #[serde(default = "default_blocks_per_round")]
    blocks_per_round: u32,

    #[serde(default = "default_schedule_grace_secs")]
    schedule_grace_secs: u64,
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            stalled_ticks: default_stalled_ticks(),
            sync_threshold_secs: default_sync_threshold_secs(),
            active_producers: default_active_producers(),
            blocks_per_round: default_blocks_per_round(),
            schedule_grace_secs: default_schedule_grace_secs(),
        }
    }
}

fn default_stalled_ticks() -> u32 {
    2
}

fn default_sync_threshold_secs() -> u64 {
    60
}

fn default_active_producers() -> u32 {
    21
}

fn default_blocks_per_round() -> u32 {
    13
}

fn default_schedule_grace_secs() -> u64 {
    360
}

#[derive(Debug, Clone, Deserialize)]
struct ControllerSection {
    #[serde(default = "default_failure_limit")]
    failure_limit: u32,

    #[serde(default = "default_heartbeat_staleness_secs")]
    heartbeat_staleness_secs: u64,
}

impl Default for ControllerSection {
    fn default() -> Self {
        Self {
            failure_limit: default_failure_limit(),
            heartbeat_staleness_secs: default_heartbeat_staleness_secs(),
        }
    }
}

fn default_failure_limit() -> u32 {
    10
}

fn default_heartbeat_staleness_secs() -> u64 {
    300
}

/// Worker wake-up periods.
#[derive(Debug, Clone, Deserialize)]
struct IntervalSection {
    #[serde(default = "default_poll_ms")]
    poll_ms: u64,

    #[serde(default = "default_schedule_secs")]
    schedule_secs: u64,

    #[serde(default = "default_missed_block_ms")]
    missed_block_ms: u64,

    #[serde(default = "default_missed_round_ms")]
    missed_round_ms: u64,

    #[serde(default = "default_log_heartbeat_secs")]
    log_heartbeat_secs: u64,

    #[serde(default = "default_log_poll_ms")]
    log_poll_ms: u64,

    #[serde(default = "default_controller_tick_secs")]
    controller_tick_secs: u64,
}

impl Default for IntervalSection {
    fn default() -> Self {
        Self {
            poll_ms: default_poll_ms(),
            schedule_secs: default_schedule_secs(),
            missed_block_ms: default_missed_block_ms(),
            missed_round_ms: default_missed_round_ms(),
            log_heartbeat_secs: default_log_heartbeat_secs(),
            log_poll_ms: default_log_poll_ms(),
            controller_tick_secs: default_controller_tick_secs(),
        }
    }
}

fn default_poll_ms() -> u64 {
    1000
}

fn default_schedule_secs() -> u64 {
    60
}

fn default_missed_block_ms() -> u64 {
    1000
}

fn default_missed_round_ms() -> u64 {
    6000
}

fn default_log_heartbeat_secs() -> u64 {
    60
}

fn default_log_poll_ms() -> u64 {
    250
}

fn default_controller_tick_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
struct StartupSection {
    #[serde(default = "default_startup_sync_secs")]
    sync_threshold_secs: u64,

    #[serde(default = "default_error_retry_secs")]
    error_retry_secs: u64,

    #[serde(default = "default_sync_retry_secs")]
    sync_retry_secs: u64,
}

impl Default for StartupSection {
    fn default() -> Self {
        Self {
            sync_threshold_secs: default_startup_sync_secs(),
            error_retry_secs: default_error_retry_secs(),
            sync_retry_secs: default_sync_retry_secs(),
        }
    }
}

fn default_startup_sync_secs() -> u64 {
    120
}

fn default_error_retry_secs() -> u64 {
    10
}

fn default_sync_retry_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AlertingSection {
    /// PagerDuty routing key.
    #[serde(default)]
    pagerduty_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TelemetrySection {
    #[serde(default)]
    log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Load configuration from a TOML file.
    fn load(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Apply CLI overrides to the configuration.
    fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(ref url) = cli.url {
            self.node.url = url.clone();
        }

        if let Some(ref log_file) = cli.log_file {
            self.node.log_file = log_file.clone();
        }

        if let Some(ref key) = cli.pager {
            self.alerting.pagerduty_key = Some(key.clone());
        }

        if let Some(ref output_log) = cli.output_log {
            self.telemetry.log_file = Some(output_log.clone());
        }
    }

    fn standby_config(&self) -> StandbyConfig {
        let sync_threshold = Duration::from_secs(self.detection.sync_threshold_secs);
        let intervals = &self.intervals;

        StandbyConfig {
            missed_block: MissedBlockConfig {
                stalled_ticks: self.detection.stalled_ticks,
                sync_threshold,
            },
            missed_round: MissedRoundConfig {
                active_producers: self.detection.active_producers,
                blocks_per_round: self.detection.blocks_per_round,
                schedule_grace: Duration::from_secs(self.detection.schedule_grace_secs),
                sync_threshold,
            },
            controller: ControllerConfig {
                failure_limit: self.controller.failure_limit,
                heartbeat_staleness: Duration::from_secs(
                    self.controller.heartbeat_staleness_secs,
                ),
            },
            intervals: WorkerIntervals {
                poll: Duration::from_millis(intervals.poll_ms),
                schedule: Duration::from_secs(intervals.schedule_secs),
                missed_block: Duration::from_millis(intervals.missed_block_ms),
                missed_round: Duration::from_millis(intervals.missed_round_ms),
                log_heartbeat: Duration::from_secs(intervals.log_heartbeat_secs),
                log_poll: Duration::from_millis(intervals.log_poll_ms),
                controller_tick: Duration::from_secs(intervals.controller_tick_secs),
                ..WorkerIntervals::default()
            },
            startup: StartupConfig {
                sync_threshold: Duration::from_secs(self.startup.sync_threshold_secs),
                error_retry: Duration::from_secs(self.startup.error_retry_secs),
                sync_retry: Duration::from_secs(self.startup.sync_retry_secs),
            },
            ..StandbyConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    config.apply_overrides(&cli);

    let log_guard = init_logging(&cli.log_level, config.telemetry.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let producer = ProducerName::new(cli.account.as_str())
        .with_context(|| format!("Invalid producer account: {:?}", cli.account))?;

    let node = HttpChainNode::with_timeout(
        &config.node.url,
        Duration::from_secs(config.node.request_timeout_secs),
    )
    .with_context(|| format!("Invalid node URL: {}", config.node.url))?;

    info!(
        producer = %producer,
        url = %node.base_url(),
        log_file = %config.node.log_file.display(),
        pagerduty = config.alerting.pagerduty_key.is_some(),
        "Standby monitor starting"
    );

    let runner = StandbyRunner::builder()
        .node(Arc::new(node))
        .producer(producer)
        .log_file(config.node.log_file.clone())
        .pagerduty_key(config.alerting.pagerduty_key.clone())
        .config(config.standby_config())
        .build()?;

    if let Err(e) = runner.run().await {
        error!(error = %e, "Standby monitor exiting");
        // Flush buffered log lines before exiting.
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}
