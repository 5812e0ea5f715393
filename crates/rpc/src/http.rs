//! [`ChainNode`] over the nodeos HTTP API.

use crate::error::RpcError;
use crate::node::ChainNode;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use standby_types::{BlockHeaderState, BlockRecord, ChainInfo, ProducerSchedule};
use std::time::Duration;
use tracing::trace;

/// Where nodeos listens by default.
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8888";

/// Upper bound on a single request. Workers poll every second, so a hung
/// request must not hold a tick for long.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const GET_INFO: &str = "/v1/chain/get_info";
const GET_BLOCK: &str = "/v1/chain/get_block";
const GET_PRODUCER_SCHEDULE: &str = "/v1/chain/get_producer_schedule";
const GET_BLOCK_HEADER_STATE: &str = "/v1/chain/get_block_header_state";
const PRODUCER_PAUSED: &str = "/v1/producer/paused";
const PRODUCER_PAUSE: &str = "/v1/producer/pause";
const PRODUCER_RESUME: &str = "/v1/producer/resume";

/// Cloneable HTTP client for one nodeos instance.
#[derive(Debug, Clone)]
pub struct HttpChainNode {
    base: Url,
    client: Client,
}

impl HttpChainNode {
    /// Create a client for the node at `url` with the default timeout.
    pub fn new(url: &str) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let base = Url::parse(url).map_err(|e| RpcError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RpcError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", base.scheme()),
            });
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RpcError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint_url(&self, endpoint: &'static str) -> Result<Url, RpcError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{endpoint}")).map_err(|e| RpcError::InvalidUrl {
            url: format!("{base}{endpoint}"),
            reason: e.to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        body: Option<serde_json::Value>,
    ) -> Result<T, RpcError> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| RpcError::Transport { endpoint, source })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| RpcError::Transport { endpoint, source })?;

        if !status.is_success() {
            return Err(RpcError::Status {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }
        trace!(endpoint, bytes = text.len(), "node response");

        serde_json::from_str(&text).map_err(|source| RpcError::Decode { endpoint, source })
    }
}

#[async_trait]
impl ChainNode for HttpChainNode {
    async fn get_info(&self) -> Result<ChainInfo, RpcError> {
        self.post(GET_INFO, None).await
    }

    async fn get_block(&self, block_num: u32) -> Result<BlockRecord, RpcError> {
        self.post(GET_BLOCK, Some(json!({ "block_num_or_id": block_num })))
            .await
    }

    async fn get_producer_schedule(&self) -> Result<ProducerSchedule, RpcError> {
        self.post(GET_PRODUCER_SCHEDULE, None).await
    }

    async fn get_block_header_state(
        &self,
        block_num: u32,
    ) -> Result<BlockHeaderState, RpcError> {
        self.post(
            GET_BLOCK_HEADER_STATE,
            Some(json!({ "block_num_or_id": block_num })),
        )
        .await
    }

    async fn is_producer_paused(&self) -> Result<bool, RpcError> {
        self.post(PRODUCER_PAUSED, None).await
    }

    async fn pause_producer(&self) -> Result<(), RpcError> {
        let _: serde_json::Value = self.post(PRODUCER_PAUSE, None).await?;
        Ok(())
    }

    async fn resume_producer(&self) -> Result<(), RpcError> {
        let _: serde_json::Value = self.post(PRODUCER_RESUME, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        let node = HttpChainNode::new("http://127.0.0.1:8888/").unwrap();
        assert_eq!(
            node.endpoint_url(GET_INFO).unwrap().as_str(),
            "http://127.0.0.1:8888/v1/chain/get_info"
        );

        let node = HttpChainNode::new("https://api.example.net:443/nodeos").unwrap();
        assert_eq!(
            node.endpoint_url(PRODUCER_PAUSED).unwrap().as_str(),
            "https://api.example.net/nodeos/v1/producer/paused"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            HttpChainNode::new("not a url"),
            Err(RpcError::InvalidUrl { .. })
        ));
        assert!(matches!(
            HttpChainNode::new("ftp://127.0.0.1:8888"),
            Err(RpcError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        // Port 9 (discard) is not an HTTP server on any sane test host.
        let node =
            HttpChainNode::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = node.get_info().await.unwrap_err();
        assert_eq!(err.endpoint(), Some(GET_INFO));
        assert!(matches!(err, RpcError::Transport { .. }));
    }
}
