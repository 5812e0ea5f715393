//! Active schedule tracking.

use super::ticker;
use crate::signals::{ControllerGone, DetectorSignals};
use crate::snapshot::SharedSchedule;
use standby_core::DetectorKind;
use standby_rpc::{ChainNode, RpcError};
use standby_types::{ProducerName, ScheduleView};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Resolves membership and neighbors for the protected producer and
/// publishes them as a [`ScheduleView`].
#[derive(Clone)]
pub struct ScheduleTracker {
    node: Arc<dyn ChainNode>,
    protected: ProducerName,
    shared: SharedSchedule,
}

impl ScheduleTracker {
    pub fn new(node: Arc<dyn ChainNode>, protected: ProducerName, shared: SharedSchedule) -> Self {
        Self {
            node,
            protected,
            shared,
        }
    }

    /// Query the schedule once and publish the result.
    pub async fn refresh(&self) -> Result<ScheduleView, RpcError> {
        let schedule = self.node.get_producer_schedule().await?;
        let view = ScheduleView::from_schedule(&schedule, &self.protected);

        let previous = self.shared.load();
        if previous.membership != view.membership || previous.neighbors != view.neighbors {
            info!(
                version = view.version,
                membership = ?view.membership,
                neighbors = ?view.neighbors,
                "Schedule changed"
            );
        } else {
            debug!(version = view.version, "Schedule unchanged");
        }

        self.shared.publish(view.clone());
        Ok(view)
    }

    /// Refresh every `period`, reporting heartbeats and failures.
    pub async fn run(self, signals: DetectorSignals, period: Duration) -> Result<(), ControllerGone> {
        let mut ticker = ticker(period);
        // Startup already refreshed once.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match self.refresh().await {
                Ok(_) => signals.heartbeat(DetectorKind::Schedule).await?,
                Err(e) => signals.failure(DetectorKind::Schedule, e).await?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standby_test_helpers::{neighbors, producer, MockChainNode};
    use standby_types::MembershipState;

    #[tokio::test]
    async fn test_refresh_publishes_view() {
        let node = Arc::new(MockChainNode::new());
        node.set_schedule(&["cccccccccccc", "aaaaaaaaaaaa", "bbbbbbbbbbbb"], 4);
        let shared = SharedSchedule::new();
        let tracker = ScheduleTracker::new(node.clone(), producer("bbbbbbbbbbbb"), shared.clone());

        let view = tracker.refresh().await.unwrap();
        assert_eq!(view.version, 4);
        assert_eq!(view.membership, MembershipState::InActiveSet);
        assert_eq!(
            shared.load().neighbors,
            Some(neighbors("aaaaaaaaaaaa", "cccccccccccc"))
        );
    }

    #[tokio::test]
    async fn test_refresh_error_keeps_previous_view() {
        let node = Arc::new(MockChainNode::new());
        node.set_schedule(&["aaaaaaaaaaaa", "bbbbbbbbbbbb"], 1);
        let shared = SharedSchedule::new();
        let tracker = ScheduleTracker::new(node.clone(), producer("bbbbbbbbbbbb"), shared.clone());
        tracker.refresh().await.unwrap();

        node.fail_schedule(true);
        assert!(tracker.refresh().await.is_err());
        assert!(shared.load().membership.is_member());
    }
}
