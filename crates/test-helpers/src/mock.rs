//! Scripted in-memory chain node.

use crate::fixtures::schedule;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use standby_rpc::{ChainNode, RpcError};
use standby_types::{BlockHeaderState, BlockRecord, ChainInfo, ProducerSchedule};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// FIO mainnet chain id, used as the default for [`MockChainNode`].
pub const MAINNET_CHAIN_ID: &str =
    "21dcae42c0182200e93f954a074011f9048a7624c6fe81d3c9541a614a88bd1c";

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    info: bool,
    block: bool,
    schedule: bool,
    header_state: bool,
    producer_api: bool,
    pause: bool,
    resume: bool,
}

#[derive(Debug)]
struct MockState {
    info: Option<ChainInfo>,
    blocks: HashMap<u32, BlockRecord>,
    schedule: Option<ProducerSchedule>,
    header_states: HashMap<u32, BlockHeaderState>,
    paused: bool,
    fail: Failures,
}

/// A [`ChainNode`] whose responses are set by the test.
///
/// Unset responses and failures injected with the `fail_*` methods return
/// [`RpcError::Status`] with status 500. Pause and resume flip the
/// reported production state, like a real node.
#[derive(Debug)]
pub struct MockChainNode {
    state: Mutex<MockState>,
    pause_calls: AtomicU32,
    resume_calls: AtomicU32,
    info_calls: AtomicU32,
    header_state_calls: AtomicU32,
}

impl Default for MockChainNode {
    fn default() -> Self {
        Self::new()
    }
}

fn mock_error(endpoint: &'static str) -> RpcError {
    RpcError::Status {
        endpoint,
        status: 500,
        body: "mock failure".to_string(),
    }
}

impl MockChainNode {
    /// A node that starts paused, with no chain data.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                info: None,
                blocks: HashMap::new(),
                schedule: None,
                header_states: HashMap::new(),
                paused: true,
                fail: Failures::default(),
            }),
            pause_calls: AtomicU32::new(0),
            resume_calls: AtomicU32::new(0),
            info_calls: AtomicU32::new(0),
            header_state_calls: AtomicU32::new(0),
        }
    }

    /// Set the head block, signed by `producer`, on the FIO mainnet chain.
    pub fn set_head(
        &self,
        block_num: u32,
        producer: &str,
        schedule_version: u32,
        time: DateTime<Utc>,
    ) {
        self.set_head_on_chain(MAINNET_CHAIN_ID, block_num, producer, schedule_version, time);
    }

    pub fn set_head_on_chain(
        &self,
        chain_id: &str,
        block_num: u32,
        producer: &str,
        schedule_version: u32,
        time: DateTime<Utc>,
    ) {
        let mut state = self.state.lock();
        state.info = Some(ChainInfo {
            chain_id: chain_id.to_string(),
            head_block_num: block_num,
            head_block_time: time,
            head_block_producer: producer.to_string(),
            last_irreversible_block_num: block_num.saturating_sub(330),
        });
        state.blocks.insert(
            block_num,
            BlockRecord {
                block_num,
                producer: producer.to_string(),
                schedule_version,
                timestamp: time,
            },
        );
    }

    /// Add a block that is not the head, e.g. a schedule boundary.
    pub fn set_block(&self, block_num: u32, producer: &str, time: DateTime<Utc>) {
        self.state.lock().blocks.insert(
            block_num,
            BlockRecord {
                block_num,
                producer: producer.to_string(),
                schedule_version: 0,
                timestamp: time,
            },
        );
    }

    pub fn set_schedule(&self, producers: &[&str], version: u32) {
        self.state.lock().schedule = Some(schedule(producers, version));
    }

    pub fn set_header_state(&self, header: BlockHeaderState) {
        self.state
            .lock()
            .header_states
            .insert(header.block_num, header);
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
    }

    pub fn paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn fail_info(&self, fail: bool) {
        self.state.lock().fail.info = fail;
    }

    pub fn fail_block(&self, fail: bool) {
        self.state.lock().fail.block = fail;
    }

    pub fn fail_schedule(&self, fail: bool) {
        self.state.lock().fail.schedule = fail;
    }

    pub fn fail_header_state(&self, fail: bool) {
        self.state.lock().fail.header_state = fail;
    }

    /// Behave as if the producer API plugin is not loaded.
    pub fn disable_producer_api(&self, disabled: bool) {
        self.state.lock().fail.producer_api = disabled;
    }

    pub fn fail_pause(&self, fail: bool) {
        self.state.lock().fail.pause = fail;
    }

    pub fn fail_resume(&self, fail: bool) {
        self.state.lock().fail.resume = fail;
    }

    pub fn pause_calls(&self) -> u32 {
        self.pause_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> u32 {
        self.resume_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> u32 {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn header_state_calls(&self) -> u32 {
        self.header_state_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainNode for MockChainNode {
    async fn get_info(&self) -> Result<ChainInfo, RpcError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.fail.info {
            return Err(mock_error("/v1/chain/get_info"));
        }
        state
            .info
            .clone()
            .ok_or_else(|| mock_error("/v1/chain/get_info"))
    }

    async fn get_block(&self, block_num: u32) -> Result<BlockRecord, RpcError> {
        let state = self.state.lock();
        if state.fail.block {
            return Err(mock_error("/v1/chain/get_block"));
        }
        state
            .blocks
            .get(&block_num)
            .cloned()
            .ok_or_else(|| mock_error("/v1/chain/get_block"))
    }

    async fn get_producer_schedule(&self) -> Result<ProducerSchedule, RpcError> {
        let state = self.state.lock();
        if state.fail.schedule {
            return Err(mock_error("/v1/chain/get_producer_schedule"));
        }
        state
            .schedule
            .clone()
            .ok_or_else(|| mock_error("/v1/chain/get_producer_schedule"))
    }

    async fn get_block_header_state(
        &self,
        block_num: u32,
    ) -> Result<BlockHeaderState, RpcError> {
        self.header_state_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if state.fail.header_state {
            return Err(mock_error("/v1/chain/get_block_header_state"));
        }
        state
            .header_states
            .get(&block_num)
            .cloned()
            .ok_or_else(|| mock_error("/v1/chain/get_block_header_state"))
    }

    async fn is_producer_paused(&self) -> Result<bool, RpcError> {
        let state = self.state.lock();
        if state.fail.producer_api {
            return Err(mock_error("/v1/producer/paused"));
        }
        Ok(state.paused)
    }

    async fn pause_producer(&self) -> Result<(), RpcError> {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.fail.pause || state.fail.producer_api {
            return Err(mock_error("/v1/producer/pause"));
        }
        state.paused = true;
        Ok(())
    }

    async fn resume_producer(&self) -> Result<(), RpcError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        if state.fail.resume || state.fail.producer_api {
            return Err(mock_error("/v1/producer/resume"));
        }
        state.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pause_and_resume_flip_state() {
        let node = MockChainNode::new();
        assert!(node.is_producer_paused().await.unwrap());

        node.resume_producer().await.unwrap();
        assert!(!node.is_producer_paused().await.unwrap());
        node.pause_producer().await.unwrap();
        assert!(node.paused());
        assert_eq!(node.pause_calls(), 1);
        assert_eq!(node.resume_calls(), 1);
    }

    #[tokio::test]
    async fn test_unset_and_failing_responses() {
        let node = MockChainNode::new();
        assert!(node.get_info().await.is_err());

        node.set_head(10, "bpaccount111", 2, Utc::now());
        let info = node.get_info().await.unwrap();
        assert_eq!(info.head_block_num, 10);
        assert_eq!(node.get_block(10).await.unwrap().schedule_version, 2);

        node.fail_info(true);
        assert!(node.get_info().await.is_err());
        assert_eq!(node.info_calls(), 3);
    }
}
