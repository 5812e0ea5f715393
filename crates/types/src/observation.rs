//! Head-of-chain snapshot shared between the poller and the detectors.

use crate::chain::{BlockRecord, ChainInfo};
use crate::time::elapsed;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The most recent head block as seen by the chain poller.
///
/// Built fresh on every successful poll and published as a whole, so readers
/// never observe a half-updated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockObservation {
    /// Head block number.
    pub block_num: u32,
    /// Account that signed the head block.
    pub producer: String,
    /// Producer schedule version the head block was produced under.
    pub schedule_version: u32,
    /// Wall-clock timestamp of the head block.
    pub head_block_time: DateTime<Utc>,
}

impl BlockObservation {
    /// Combine a `get_info` response with the head block it points at.
    pub fn from_head(info: &ChainInfo, block: &BlockRecord) -> Self {
        Self {
            block_num: block.block_num,
            producer: block.producer.clone(),
            schedule_version: block.schedule_version,
            head_block_time: info.head_block_time,
        }
    }

    /// True when the head block is strictly older than `threshold`, meaning
    /// the node is replaying or has lost its peers.
    pub fn is_syncing(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        elapsed(self.head_block_time, now) > threshold
    }
}
