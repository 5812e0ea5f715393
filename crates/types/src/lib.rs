//! Shared types for the standby producer monitor.
//!
//! This crate provides the foundational types used by the detectors, the
//! controller and the node RPC client:
//!
//! - **Identity**: [`ProducerName`], the validated account this process protects
//! - **Chain payloads**: [`ChainInfo`], [`BlockRecord`], [`ProducerSchedule`],
//!   [`BlockHeaderState`] as returned by the node's HTTP API
//! - **Snapshots**: [`BlockObservation`] and [`ScheduleView`], published by a
//!   single writer and read by every detector
//! - **State**: [`ProductionState`] and [`MembershipState`]
//!
//! # Design Philosophy
//!
//! This crate does not depend on any other workspace crate, making it the
//! foundation layer.

mod chain;
mod observation;
mod producer;
mod schedule;
mod time;

pub use chain::{
    BlockHeaderState, BlockRecord, ChainInfo, PendingSchedule, ProducerKey, ProducerSchedule,
    ScheduleSet,
};
pub use observation::BlockObservation;
pub use producer::{ProducerName, ProducerNameError, PRODUCER_NAME_LEN};
pub use schedule::{MembershipState, NeighborSet, ScheduleView};
pub use time::{elapsed, nodeos_time};

/// Whether the local node is currently signing blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProductionState {
    /// Block production is paused; this node is standing by.
    #[default]
    Paused,
    /// This node is producing blocks for the protected producer.
    Active,
}

impl ProductionState {
    /// Build from the node's `paused` flag.
    pub fn from_paused(paused: bool) -> Self {
        if paused {
            ProductionState::Paused
        } else {
            ProductionState::Active
        }
    }

    pub fn is_paused(self) -> bool {
        matches!(self, ProductionState::Paused)
    }
}

impl std::fmt::Display for ProductionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductionState::Paused => write!(f, "paused"),
            ProductionState::Active => write!(f, "active"),
        }
    }
}
