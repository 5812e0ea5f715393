//! Checks and preparation before monitoring starts.

use crate::config::StartupConfig;
use chrono::Utc;
use standby_rpc::{ChainNode, RpcError};
use standby_types::{elapsed, ChainInfo};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// FIO mainnet chain id.
pub const FIO_MAINNET_CHAIN_ID: &str =
    "21dcae42c0182200e93f954a074011f9048a7624c6fe81d3c9541a614a88bd1c";

/// FIO testnet chain id.
pub const FIO_TESTNET_CHAIN_ID: &str =
    "b20901380af44ef59c5918439a1f9a41d83669020319a80574b804a5f95cbd7e";

/// Startup failures. All of these are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot read node log {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("node producer API is unavailable, is producer_api_plugin enabled? {0}")]
    ProducerApi(#[source] RpcError),

    #[error("could not pause production at startup: {0}")]
    ForcePause(#[source] RpcError),
}

/// What startup learned about the node.
#[derive(Debug, Clone)]
pub struct StartupReport {
    /// Label prefixed to alert summaries.
    pub network: &'static str,
    /// The first synced `get_info`.
    pub head: ChainInfo,
    /// Whether the node was producing when we started and had to be paused.
    pub was_producing: bool,
}

/// Human label for a chain id.
pub fn network_label(chain_id: &str) -> &'static str {
    match chain_id {
        FIO_MAINNET_CHAIN_ID => "mainnet",
        FIO_TESTNET_CHAIN_ID => "testnet",
        _ => "unknown network",
    }
}

/// The node log must exist and be readable.
pub async fn check_log_file(path: &Path) -> Result<(), StartupError> {
    let to_err = |source| StartupError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    let file = tokio::fs::File::open(path).await.map_err(to_err)?;
    file.metadata().await.map_err(to_err)?;
    Ok(())
}

/// Confirm the producer API is reachable. Returns whether production is
/// currently paused.
pub async fn check_producer_api(node: &dyn ChainNode) -> Result<bool, StartupError> {
    node.is_producer_paused()
        .await
        .map_err(StartupError::ProducerApi)
}

/// Block until the node's head is recent.
///
/// Never fails: query errors and a syncing node are both retried.
pub async fn wait_for_sync(node: &dyn ChainNode, config: &StartupConfig) -> ChainInfo {
    loop {
        match node.get_info().await {
            Ok(info) => {
                let age = elapsed(info.head_block_time, Utc::now());
                if age <= config.sync_threshold {
                    return info;
                }
                info!(
                    head = %info.head_block_time,
                    head_block_num = info.head_block_num,
                    "Node appears to be syncing, waiting for sync"
                );
                tokio::time::sleep(config.sync_retry).await;
            }
            Err(e) => {
                warn!(error = %e, "Could not get chain info, retrying");
                tokio::time::sleep(config.error_retry).await;
            }
        }
    }
}

/// Make sure the node is not producing. Returns whether it had to be paused.
pub async fn force_pause(node: &dyn ChainNode, paused: bool) -> Result<bool, StartupError> {
    if paused {
        return Ok(false);
    }
    warn!("Node is producing at startup, pausing");
    node.pause_producer()
        .await
        .map_err(StartupError::ForcePause)?;
    Ok(true)
}

/// Run the startup sequence: log file, producer API, network label, sync
/// wait and forced pause, in that order.
pub async fn prepare(
    node: &dyn ChainNode,
    log_file: &Path,
    config: &StartupConfig,
) -> Result<StartupReport, StartupError> {
    check_log_file(log_file).await?;
    check_producer_api(node).await?;

    let head = wait_for_sync(node, config).await;
    let network = network_label(&head.chain_id);
    info!(network, chain_id = %head.chain_id, head_block_num = head.head_block_num, "Node is synced");

    // Re-read right before pausing; the earlier answer may be minutes old.
    let paused = check_producer_api(node).await?;
    let was_producing = force_pause(node, paused).await?;

    Ok(StartupReport {
        network,
        head,
        was_producing,
    })
}
