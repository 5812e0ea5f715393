//! RPC error types.

use thiserror::Error;

/// Errors from talking to the node.
///
/// All of these are treated as transient by the workers: the failure is
/// reported to the controller and the next tick simply tries again.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid node url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl RpcError {
    /// The endpoint the failed request was sent to, if one was reached.
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            RpcError::InvalidUrl { .. } => None,
            RpcError::Transport { endpoint, .. }
            | RpcError::Status { endpoint, .. }
            | RpcError::Decode { endpoint, .. } => Some(endpoint),
        }
    }
}
