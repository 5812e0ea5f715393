//! Operator notifications.
//!
//! Delivery is fire-and-forget: [`AlertSink::notify`] returns immediately and
//! never blocks the controller loop. Delivery errors are logged.

use reqwest::Client;
use serde::Serialize;
use standby_core::{Alert, AlertSeverity};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// PagerDuty Events API v2 endpoint.
pub const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors delivering an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for operator alerts.
pub trait AlertSink: Send + Sync {
    /// Queue `alert` for delivery. Must not block.
    fn notify(&self, alert: &Alert);
}

/// Writes alerts to the tracing log only.
#[derive(Debug, Clone)]
pub struct LoggingAlertSink {
    producer: String,
    network: String,
}

impl LoggingAlertSink {
    pub fn new(producer: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            network: network.into(),
        }
    }
}

impl AlertSink for LoggingAlertSink {
    fn notify(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::Trigger => warn!(
                producer = %self.producer,
                network = %self.network,
                "ALERT: {}",
                alert.message
            ),
            AlertSeverity::Resolve => info!(
                producer = %self.producer,
                network = %self.network,
                "RESOLVED: {}",
                alert.message
            ),
        }
    }
}

/// Body of a PagerDuty Events v2 request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerDutyEvent {
    pub routing_key: String,
    pub event_action: &'static str,
    pub dedup_key: String,
    pub payload: PagerDutyPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagerDutyPayload {
    pub summary: String,
    pub source: String,
    pub severity: &'static str,
}

/// Sends alerts to PagerDuty, one incident per producer.
///
/// Failover opens (or re-triggers) the incident; stand-down resolves it.
#[derive(Debug, Clone)]
pub struct PagerDutyAlertSink {
    client: Client,
    endpoint: String,
    routing_key: String,
    producer: String,
    network: String,
}

impl PagerDutyAlertSink {
    pub fn new(
        routing_key: impl Into<String>,
        producer: impl Into<String>,
        network: impl Into<String>,
    ) -> Result<Self, AlertError> {
        Self::with_endpoint(PAGERDUTY_EVENTS_URL, routing_key, producer, network)
    }

    /// Like [`new`](Self::new) but posting to `endpoint`.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        routing_key: impl Into<String>,
        producer: impl Into<String>,
        network: impl Into<String>,
    ) -> Result<Self, AlertError> {
        let client = Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            routing_key: routing_key.into(),
            producer: producer.into(),
            network: network.into(),
        })
    }

    /// Build the request body for `alert`.
    pub fn event(&self, alert: &Alert) -> PagerDutyEvent {
        let (event_action, severity) = match alert.severity {
            AlertSeverity::Trigger => ("trigger", "error"),
            AlertSeverity::Resolve => ("resolve", "info"),
        };
        PagerDutyEvent {
            routing_key: self.routing_key.clone(),
            event_action,
            dedup_key: self.producer.clone(),
            payload: PagerDutyPayload {
                summary: format!("{} {}", self.network, alert.message),
                source: self.producer.clone(),
                severity,
            },
        }
    }

    async fn deliver(
        client: &Client,
        endpoint: &str,
        event: &PagerDutyEvent,
    ) -> Result<(), AlertError> {
        let response = client.post(endpoint).json(event).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(AlertError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl AlertSink for PagerDutyAlertSink {
    fn notify(&self, alert: &Alert) {
        let event = self.event(alert);
        info!(
            action = event.event_action,
            summary = %event.payload.summary,
            "Sending PagerDuty event"
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available, PagerDuty event dropped");
            return;
        };
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        handle.spawn(async move {
            if let Err(e) = Self::deliver(&client, &endpoint, &event).await {
                error!(
                    error = %e,
                    action = event.event_action,
                    "Failed to send PagerDuty event"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> PagerDutyAlertSink {
        PagerDutyAlertSink::new("R0UT1NGKEY", "bpaccount111", "mainnet").unwrap()
    }

    #[test]
    fn test_trigger_event() {
        let event = sink().event(&Alert::trigger("standby enabled block production"));
        assert_eq!(event.event_action, "trigger");
        assert_eq!(event.payload.severity, "error");
        assert_eq!(event.dedup_key, "bpaccount111");
        assert_eq!(event.payload.source, "bpaccount111");
        assert_eq!(
            event.payload.summary,
            "mainnet standby enabled block production"
        );
    }

    #[test]
    fn test_resolve_event_serializes() {
        let event = sink().event(&Alert::resolve(
            "standby producer shutting down, primary is back",
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["routing_key"], "R0UT1NGKEY");
        assert_eq!(json["event_action"], "resolve");
        assert_eq!(json["payload"]["severity"], "info");
        assert_eq!(
            json["payload"]["summary"],
            "mainnet standby producer shutting down, primary is back"
        );
    }

    #[test]
    fn test_notify_without_runtime_does_not_panic() {
        sink().notify(&Alert::trigger("test"));
        LoggingAlertSink::new("bpaccount111", "testnet").notify(&Alert::resolve("test"));
    }
}
