//! Test helpers for the standby producer monitor.
//!
//! Provides a scripted [`MockChainNode`] that stands in for nodeos, and small
//! builders for the chain types the detectors consume.
//!
//! # Example
//!
//! ```rust
//! use standby_test_helpers::{producer, MockChainNode};
//!
//! let node = MockChainNode::new();
//! node.set_schedule(&["aaaaaaaaaaaa", "bbbbbbbbbbbb", "cccccccccccc"], 1);
//! node.set_head(100, "aaaaaaaaaaaa", 1, chrono::Utc::now());
//!
//! let protected = producer("bbbbbbbbbbbb");
//! assert_eq!(protected.as_str(), "bbbbbbbbbbbb");
//! ```

pub mod fixtures;
mod mock;

pub use fixtures::{header_state, neighbors, observation, observation_at, producer, schedule};
pub use mock::{MockChainNode, MAINNET_CHAIN_ID};
