//! Node HTTP API payloads.
//!
//! Only the fields the monitor reads are modelled; everything else in the
//! node's responses is ignored during deserialization.

use crate::time::nodeos_time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `/v1/chain/get_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: String,
    pub head_block_num: u32,
    #[serde(with = "nodeos_time")]
    pub head_block_time: DateTime<Utc>,
    pub head_block_producer: String,
    #[serde(default)]
    pub last_irreversible_block_num: u32,
}

/// Response of `/v1/chain/get_block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub block_num: u32,
    pub producer: String,
    #[serde(default)]
    pub schedule_version: u32,
    #[serde(with = "nodeos_time")]
    pub timestamp: DateTime<Utc>,
}

/// Response of `/v1/chain/get_producer_schedule`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSchedule {
    pub active: ScheduleSet,
}

impl ProducerSchedule {
    /// Account names in the active schedule, in schedule order.
    pub fn active_producers(&self) -> impl Iterator<Item = &str> {
        self.active.producers.iter().map(|p| p.producer_name.as_str())
    }
}

/// One producer schedule (active, pending or proposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSet {
    pub version: u32,
    #[serde(default)]
    pub producers: Vec<ProducerKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerKey {
    pub producer_name: String,
}

/// Response of `/v1/chain/get_block_header_state`.
///
/// Only available for reversible blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderState {
    pub block_num: u32,
    #[serde(default)]
    pub pending_schedule: Option<PendingSchedule>,
    /// `(producer, last block number it signed)` pairs.
    #[serde(default)]
    pub producer_to_last_produced: Vec<(String, u32)>,
}

impl BlockHeaderState {
    /// Last block signed by `producer`, if the node tracks it.
    pub fn last_produced(&self, producer: &str) -> Option<u32> {
        self.producer_to_last_produced
            .iter()
            .find(|(name, _)| name == producer)
            .map(|(_, num)| *num)
    }
}

/// Boundary of the schedule currently being promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSchedule {
    /// Irreversible block at which the pending schedule was proposed.
    pub schedule_lib_num: u32,
}
