//! Missed round detection from the node's last-produced bookkeeping.
//!
//! Evaluated at most once per schedule version. The node's
//! `producer_to_last_produced` table is only meaningful once the schedule
//! has been in force for a while, so evaluation is deferred until the
//! pending schedule boundary block is older than the grace period.

use crate::config::MissedRoundConfig;
use chrono::{DateTime, Utc};
use standby_types::{elapsed, BlockHeaderState, BlockObservation, ProducerName};
use tracing::{debug, info};

/// Outcome of inspecting a block-header state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundCheck {
    /// No pending schedule or the chain is syncing. Retry next tick.
    Unavailable,

    /// The boundary block must be fetched and passed to
    /// [`MissedRoundDetector::boundary_observed`] before evaluating.
    NeedsBoundary { block_num: u32 },

    /// Evaluation finished and the schedule version is consumed.
    Complete {
        missed: bool,
        last_produced: Option<u32>,
    },
}

#[derive(Debug, Clone)]
pub struct MissedRoundDetector {
    protected: ProducerName,
    config: MissedRoundConfig,
    evaluated_version: Option<u32>,
    verified_boundary: Option<u32>,
}

impl MissedRoundDetector {
    pub fn new(protected: ProducerName, config: MissedRoundConfig) -> Self {
        Self {
            protected,
            config,
            evaluated_version: None,
            verified_boundary: None,
        }
    }

    /// Whether `observation` carries a schedule version that has not been
    /// evaluated yet.
    pub fn is_due(&self, observation: &BlockObservation) -> bool {
        self.evaluated_version
            .map_or(true, |v| observation.schedule_version > v)
    }

    /// Inspect the header state fetched at the observed head.
    pub fn check_header(
        &mut self,
        observation: &BlockObservation,
        header: &BlockHeaderState,
        now: DateTime<Utc>,
    ) -> RoundCheck {
        let Some(pending) = header.pending_schedule.as_ref() else {
            debug!(block_num = header.block_num, "No pending schedule, node may not be synced");
            return RoundCheck::Unavailable;
        };
        if observation.is_syncing(now, self.config.sync_threshold) {
            return RoundCheck::Unavailable;
        }
        if self.verified_boundary != Some(pending.schedule_lib_num) {
            return RoundCheck::NeedsBoundary {
                block_num: pending.schedule_lib_num,
            };
        }

        let head = observation.block_num;
        let last_produced = header.last_produced(self.protected.as_str());
        let missed = last_produced
            .is_some_and(|last| last < head.saturating_sub(self.config.lag_blocks()));

        if let (true, Some(last)) = (missed, last_produced) {
            info!(
                producer = %self.protected,
                last_produced = last,
                blocks_ago = head - last,
                "Detected producer has missed a round"
            );
        }

        self.evaluated_version = Some(observation.schedule_version);
        RoundCheck::Complete {
            missed,
            last_produced,
        }
    }

    /// Record the timestamp of the schedule boundary block.
    ///
    /// Returns `true` once the boundary is at least the grace period old, at
    /// which point it is remembered and the next
    /// [`check_header`](Self::check_header) can complete.
    pub fn boundary_observed(
        &mut self,
        block_num: u32,
        boundary_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if now < boundary_time || elapsed(boundary_time, now) < self.config.schedule_grace {
            debug!(
                boundary = block_num,
                "Schedule boundary within grace period, deferring round check"
            );
            return false;
        }
        self.verified_boundary = Some(block_num);
        true
    }

    pub fn evaluated_version(&self) -> Option<u32> {
        self.evaluated_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use standby_test_helpers::{header_state, producer};
    use std::time::Duration;

    const B: &str = "bbbbbbbbbbbb";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn obs(block_num: u32, version: u32) -> BlockObservation {
        BlockObservation {
            block_num,
            producer: "aaaaaaaaaaaa".into(),
            schedule_version: version,
            head_block_time: now(),
        }
    }

    fn detector() -> MissedRoundDetector {
        MissedRoundDetector::new(producer(B), MissedRoundConfig::default())
    }

    #[test]
    fn test_grace_period_defers_evaluation() {
        let mut det = detector();
        let head = obs(10_000, 4);
        let header = header_state(10_000, Some(9_000), &[(B, 100)]);

        assert_eq!(
            det.check_header(&head, &header, now()),
            RoundCheck::NeedsBoundary { block_num: 9_000 }
        );

        let recent = now() - chrono::Duration::minutes(5);
        assert!(!det.boundary_observed(9_000, recent, now()));
        assert!(det.is_due(&head));
        assert_eq!(
            det.check_header(&head, &header, now()),
            RoundCheck::NeedsBoundary { block_num: 9_000 }
        );

        let old = now() - chrono::Duration::minutes(6);
        assert!(det.boundary_observed(9_000, old, now()));
        assert_eq!(
            det.check_header(&head, &header, now()),
            RoundCheck::Complete {
                missed: true,
                last_produced: Some(100)
            }
        );
        assert!(!det.is_due(&head));
        assert!(det.is_due(&obs(10_001, 5)));
    }

    #[test]
    fn test_lag_is_strict() {
        let mut det = detector();
        det.boundary_observed(9_000, now() - chrono::Duration::hours(1), now());
        let head = obs(10_000, 4);

        // Exactly lag blocks behind is not a miss.
        let header = header_state(10_000, Some(9_000), &[(B, 10_000 - 273)]);
        assert_eq!(
            det.check_header(&head, &header, now()),
            RoundCheck::Complete {
                missed: false,
                last_produced: Some(9_727)
            }
        );

        let mut det = detector();
        det.boundary_observed(9_000, now() - chrono::Duration::hours(1), now());
        let header = header_state(10_000, Some(9_000), &[(B, 10_000 - 274)]);
        assert!(matches!(
            det.check_header(&head, &header, now()),
            RoundCheck::Complete { missed: true, .. }
        ));
    }

    #[test]
    fn test_young_chain_does_not_underflow() {
        let mut det = detector();
        det.boundary_observed(1, now() - chrono::Duration::hours(1), now());
        let header = header_state(100, Some(1), &[(B, 0)]);
        assert!(matches!(
            det.check_header(&obs(100, 1), &header, now()),
            RoundCheck::Complete { missed: false, .. }
        ));
    }

    #[test]
    fn test_missing_pending_schedule_does_not_consume_version() {
        let mut det = detector();
        let head = obs(10_000, 4);
        let header = header_state(10_000, None, &[(B, 100)]);

        assert_eq!(det.check_header(&head, &header, now()), RoundCheck::Unavailable);
        assert!(det.is_due(&head));
        assert_eq!(det.evaluated_version(), None);
    }

    #[test]
    fn test_syncing_chain_is_unavailable() {
        let mut det = detector();
        let head = obs(10_000, 4);
        let header = header_state(10_000, Some(9_000), &[(B, 100)]);
        let later = now() + chrono::Duration::from_std(Duration::from_secs(120)).unwrap();

        assert_eq!(det.check_header(&head, &header, later), RoundCheck::Unavailable);
    }

    #[test]
    fn test_untracked_producer_is_not_missing() {
        let mut det = detector();
        det.boundary_observed(9_000, now() - chrono::Duration::hours(1), now());
        let header = header_state(10_000, Some(9_000), &[("cccccccccccc", 1)]);
        assert_eq!(
            det.check_header(&obs(10_000, 4), &header, now()),
            RoundCheck::Complete {
                missed: false,
                last_produced: None
            }
        );
    }
}
