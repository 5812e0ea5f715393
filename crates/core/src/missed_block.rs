//! Turn-order missed block detection.
//!
//! Producers sign in alphabetical order. Once the protected producer's
//! predecessor signs, the protected producer is due next. Two things then
//! indicate it is missing:
//!
//! - the successor signs without the protected producer having signed
//!   (its whole turn was skipped), or
//! - the head stops advancing for several ticks while it is due (nobody is
//!   producing in its slot).

use crate::config::MissedBlockConfig;
use crate::detector::MissKind;
use standby_types::{BlockObservation, NeighborSet, ProducerName};
use tracing::{debug, info};

/// Per-tick missed block state machine.
///
/// Fed the latest [`BlockObservation`] once per tick while local production
/// is paused.
#[derive(Debug, Clone)]
pub struct MissedBlockDetector {
    protected: ProducerName,
    stalled_ticks: u32,
    produced: bool,
    next_expected: bool,
    miss_streak: u32,
    last_block: Option<u32>,
    /// Head height at which a stall was last declared. Held until the head
    /// moves so one stall yields one signal.
    stalled_at: Option<u32>,
}

impl MissedBlockDetector {
    pub fn new(protected: ProducerName, config: &MissedBlockConfig) -> Self {
        Self {
            protected,
            stalled_ticks: config.stalled_ticks.max(1),
            produced: false,
            next_expected: false,
            miss_streak: 0,
            last_block: None,
            stalled_at: None,
        }
    }

    /// Evaluate one tick.
    ///
    /// Returns the kind of miss if this tick completes a missed-block
    /// incident. A single incident yields a single signal.
    pub fn observe(
        &mut self,
        observation: &BlockObservation,
        neighbors: &NeighborSet,
    ) -> Option<MissKind> {
        if self.stalled_at == Some(observation.block_num) {
            self.last_block = Some(observation.block_num);
            return None;
        }
        self.stalled_at = None;

        let mut miss = None;
        let signer = observation.producer.as_str();

        if self.protected == signer {
            self.produced = true;
            self.next_expected = false;
            self.miss_streak = 0;
        } else if signer == neighbors.before {
            self.next_expected = true;
            self.produced = false;
        } else if signer == neighbors.after && self.next_expected {
            if !self.produced {
                info!(
                    producer = %self.protected,
                    "Producer was scheduled to be next, but did not produce"
                );
                miss = Some(MissKind::SkippedTurn);
            }
            self.next_expected = false;
        }

        let stalled = self.last_block == Some(observation.block_num);
        if stalled {
            debug!(
                block_num = observation.block_num,
                last_producer = %observation.producer,
                "Block not incrementing"
            );
            if self.next_expected {
                self.miss_streak += 1;
            }
        }
        self.last_block = Some(observation.block_num);

        if self.miss_streak >= self.stalled_ticks {
            info!(
                producer = %self.protected,
                stalled_ticks = self.miss_streak,
                "Head block failed to increment during the producer's turn, declaring as missing"
            );
            self.next_expected = false;
            self.miss_streak = 0;
            self.stalled_at = Some(observation.block_num);
            miss = miss.or(Some(MissKind::StalledHead));
        }

        miss
    }

    /// Forget all turn tracking. Called while local production is active so
    /// a later pause starts from a clean slate.
    pub fn reset(&mut self) {
        self.produced = false;
        self.next_expected = false;
        self.miss_streak = 0;
        self.last_block = None;
        self.stalled_at = None;
    }

    /// Whether the protected producer is currently due to sign.
    pub fn next_expected(&self) -> bool {
        self.next_expected
    }

    pub fn miss_streak(&self) -> u32 {
        self.miss_streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use standby_test_helpers::{neighbors, observation, producer};

    const A: &str = "aaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbb";
    const C: &str = "cccccccccccc";

    fn detector() -> MissedBlockDetector {
        MissedBlockDetector::new(producer(B), &MissedBlockConfig::default())
    }

    #[test]
    fn test_predecessor_then_two_stalled_ticks_signals_once() {
        let mut det = detector();
        let n = neighbors(A, C);

        assert_eq!(det.observe(&observation(100, A), &n), None);
        assert!(det.next_expected());
        assert_eq!(det.observe(&observation(100, A), &n), None);
        assert_eq!(
            det.observe(&observation(100, A), &n),
            Some(MissKind::StalledHead)
        );
        assert!(!det.next_expected());

        // Head still stuck: no repeat signal for the same incident.
        for _ in 0..5 {
            assert_eq!(det.observe(&observation(100, A), &n), None);
        }
        assert!(!det.next_expected());
    }

    #[test]
    fn test_stuck_head_signals_once_per_incident() {
        let mut det = detector();
        let n = neighbors(A, C);

        let fired: Vec<usize> = (1..=9)
            .filter(|_| det.observe(&observation(100, A), &n).is_some())
            .collect();
        assert_eq!(fired, vec![3]);

        // The head moves on and the predecessor stalls again: a new incident.
        assert_eq!(det.observe(&observation(101, A), &n), None);
        assert_eq!(det.observe(&observation(101, A), &n), None);
        assert_eq!(
            det.observe(&observation(101, A), &n),
            Some(MissKind::StalledHead)
        );
        assert_eq!(det.observe(&observation(101, A), &n), None);
    }

    #[test]
    fn test_skipped_turn() {
        let mut det = detector();
        let n = neighbors(A, C);

        assert_eq!(det.observe(&observation(100, A), &n), None);
        assert_eq!(det.observe(&observation(101, A), &n), None);
        assert_eq!(
            det.observe(&observation(102, C), &n),
            Some(MissKind::SkippedTurn)
        );
        assert!(!det.next_expected());
        assert_eq!(det.observe(&observation(103, C), &n), None);
    }

    #[test]
    fn test_produced_in_between_is_not_a_miss() {
        let mut det = detector();
        let n = neighbors(A, C);

        assert_eq!(det.observe(&observation(100, A), &n), None);
        assert_eq!(det.observe(&observation(101, B), &n), None);
        assert!(!det.next_expected());
        assert_eq!(det.observe(&observation(102, C), &n), None);
    }

    #[test]
    fn test_stall_outside_turn_is_ignored() {
        let mut det = detector();
        let n = neighbors(A, C);

        for _ in 0..10 {
            assert_eq!(det.observe(&observation(200, C), &n), None);
        }
        assert_eq!(det.miss_streak(), 0);
    }

    #[test]
    fn test_own_block_resets_streak() {
        let mut det = detector();
        let n = neighbors(A, C);

        det.observe(&observation(100, A), &n);
        det.observe(&observation(100, A), &n);
        assert_eq!(det.miss_streak(), 1);

        det.observe(&observation(101, B), &n);
        assert_eq!(det.miss_streak(), 0);
        assert!(!det.next_expected());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut det = detector();
        let n = neighbors(A, C);

        det.observe(&observation(100, A), &n);
        det.observe(&observation(100, A), &n);
        det.reset();
        assert!(!det.next_expected());
        assert_eq!(det.miss_streak(), 0);

        // First observation after reset counts as an advance.
        assert_eq!(det.observe(&observation(100, A), &n), None);
        assert_eq!(det.miss_streak(), 0);
    }
}
