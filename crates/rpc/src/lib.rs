//! Chain node RPC for the standby producer monitor.
//!
//! [`ChainNode`] is the seam between the monitor and nodeos. Workers hold an
//! `Arc<dyn ChainNode>`; production uses [`HttpChainNode`], tests use the
//! scripted mock from `standby-test-helpers`.

mod error;
mod http;
mod node;

pub use error::RpcError;
pub use http::{HttpChainNode, DEFAULT_NODE_URL, DEFAULT_REQUEST_TIMEOUT};
pub use node::ChainNode;
