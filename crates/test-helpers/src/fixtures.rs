//! Builders for chain fixtures.

use chrono::{DateTime, Utc};
use standby_types::{
    BlockHeaderState, BlockObservation, NeighborSet, PendingSchedule, ProducerKey, ProducerName,
    ProducerSchedule, ScheduleSet,
};

/// Parse a producer name, panicking on invalid input.
pub fn producer(name: &str) -> ProducerName {
    ProducerName::new(name).unwrap_or_else(|e| panic!("invalid test producer {name:?}: {e}"))
}

pub fn neighbors(before: &str, after: &str) -> NeighborSet {
    NeighborSet {
        before: before.to_string(),
        after: after.to_string(),
    }
}

/// An observation of a fresh head block on schedule version 1.
pub fn observation(block_num: u32, producer: &str) -> BlockObservation {
    observation_at(block_num, producer, 1, Utc::now())
}

pub fn observation_at(
    block_num: u32,
    producer: &str,
    schedule_version: u32,
    head_block_time: DateTime<Utc>,
) -> BlockObservation {
    BlockObservation {
        block_num,
        producer: producer.to_string(),
        schedule_version,
        head_block_time,
    }
}

/// An active schedule listing `producers` in the given order.
pub fn schedule(producers: &[&str], version: u32) -> ProducerSchedule {
    ProducerSchedule {
        active: ScheduleSet {
            version,
            producers: producers
                .iter()
                .map(|p| ProducerKey {
                    producer_name: p.to_string(),
                })
                .collect(),
        },
    }
}

/// A block-header state at `block_num`.
///
/// `schedule_lib_num` of `None` models a node that reports no pending
/// schedule.
pub fn header_state(
    block_num: u32,
    schedule_lib_num: Option<u32>,
    last_produced: &[(&str, u32)],
) -> BlockHeaderState {
    BlockHeaderState {
        block_num,
        pending_schedule: schedule_lib_num.map(|schedule_lib_num| PendingSchedule {
            schedule_lib_num,
        }),
        producer_to_last_produced: last_produced
            .iter()
            .map(|(name, num)| (name.to_string(), *num))
            .collect(),
    }
}
