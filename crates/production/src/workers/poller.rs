//! Chain info poller.

use super::ticker;
use crate::signals::{ControllerGone, DetectorSignals};
use crate::snapshot::SharedObservation;
use standby_core::DetectorKind;
use standby_rpc::{ChainNode, RpcError};
use standby_types::BlockObservation;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Read the head from `get_info`, then fetch that block for its producer
/// and schedule version.
pub async fn poll_head(node: &dyn ChainNode) -> Result<BlockObservation, RpcError> {
    let info = node.get_info().await?;
    let block = node.get_block(info.head_block_num).await?;
    Ok(BlockObservation::from_head(&info, &block))
}

/// Publish a fresh observation every `period`.
///
/// A failed poll leaves the previous observation in place.
pub async fn run_poller(
    node: Arc<dyn ChainNode>,
    shared: SharedObservation,
    signals: DetectorSignals,
    period: Duration,
) -> Result<(), ControllerGone> {
    let mut ticker = ticker(period);
    loop {
        ticker.tick().await;
        match poll_head(node.as_ref()).await {
            Ok(observation) => {
                trace!(
                    block_num = observation.block_num,
                    producer = %observation.producer,
                    "Head observed"
                );
                shared.publish(observation);
                signals.heartbeat(DetectorKind::BlockUpdates).await?;
            }
            Err(e) => signals.failure(DetectorKind::BlockUpdates, e).await?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal_channels;
    use chrono::Utc;
    use standby_test_helpers::MockChainNode;

    #[tokio::test(start_paused = true)]
    async fn test_poll_head_combines_info_and_block() {
        let node = MockChainNode::new();
        let now = Utc::now();
        node.set_head(500, "bpaccount111", 9, now);

        let obs = poll_head(&node).await.unwrap();
        assert_eq!(obs.block_num, 500);
        assert_eq!(obs.producer, "bpaccount111");
        assert_eq!(obs.schedule_version, 9);
        assert_eq!(obs.head_block_time, now);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_observation() {
        let node = Arc::new(MockChainNode::new());
        node.set_head(500, "bpaccount111", 9, Utc::now());
        let shared = SharedObservation::new();
        let (signals, mut rx) = signal_channels(8);

        let task = tokio::spawn(run_poller(
            node.clone(),
            shared.clone(),
            signals,
            Duration::from_millis(10),
        ));

        assert_eq!(rx.heartbeat.recv().await, Some(DetectorKind::BlockUpdates));
        node.fail_block(true);
        let failure = rx.failure.recv().await.unwrap();
        assert_eq!(failure.detector, DetectorKind::BlockUpdates);
        assert_eq!(shared.load().map(|o| o.block_num), Some(500));

        task.abort();
    }
}
