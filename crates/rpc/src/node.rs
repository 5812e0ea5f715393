use crate::error::RpcError;
use async_trait::async_trait;
use standby_types::{BlockHeaderState, BlockRecord, ChainInfo, ProducerSchedule};

/// The subset of the nodeos chain and producer APIs the monitor uses.
///
/// Implementations must be safe to share between all worker tasks.
#[async_trait]
pub trait ChainNode: Send + Sync {
    /// `/v1/chain/get_info`
    async fn get_info(&self) -> Result<ChainInfo, RpcError>;

    /// `/v1/chain/get_block`
    async fn get_block(&self, block_num: u32) -> Result<BlockRecord, RpcError>;

    /// `/v1/chain/get_producer_schedule`
    async fn get_producer_schedule(&self) -> Result<ProducerSchedule, RpcError>;

    /// `/v1/chain/get_block_header_state`. Only reversible blocks are
    /// available.
    async fn get_block_header_state(&self, block_num: u32)
        -> Result<BlockHeaderState, RpcError>;

    /// `/v1/producer/paused`. Fails if the producer API plugin is not
    /// enabled on the node.
    async fn is_producer_paused(&self) -> Result<bool, RpcError>;

    /// `/v1/producer/pause`
    async fn pause_producer(&self) -> Result<(), RpcError>;

    /// `/v1/producer/resume`
    async fn resume_producer(&self) -> Result<(), RpcError>;
}
