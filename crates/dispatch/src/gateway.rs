//! Client for the agent messaging gateway.
//!
//! Notifications reach a board lead by POSTing to the lead's session on the
//! board's configured gateway. Delivery sits behind the `AgentMessenger`
//! trait so the worker pipeline can run against a fake in tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use herald_common::types::Gateway;

/// Timeout for a single message delivery request. The worker loop applies no
/// timeout of its own to processing, so the HTTP client must bound it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message delivery errors. Both variants are retryable from the worker's
/// point of view.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway rejected message: HTTP {status}")]
    Rejected { status: reqwest::StatusCode },
}

/// Delivers notification text to an agent session.
#[async_trait]
pub trait AgentMessenger: Send + Sync {
    async fn send_message(
        &self,
        gateway: &Gateway,
        session_key: &str,
        message: &str,
    ) -> Result<(), GatewayError>;
}

/// Production messenger posting to the gateway's session-message endpoint.
pub struct GatewayClient {
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl AgentMessenger for GatewayClient {
    async fn send_message(
        &self,
        gateway: &Gateway,
        session_key: &str,
        message: &str,
    ) -> Result<(), GatewayError> {
        let url = message_url(&gateway.url, session_key);

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Rejected {
                status: response.status(),
            });
        }

        tracing::debug!(session_key, gateway = %gateway.name, "Message delivered to agent session");
        Ok(())
    }
}

/// Session-message endpoint for a lead session on a gateway.
///
/// The session key is percent-encoded so separator characters like `/` or
/// `?` stay inside the one path segment.
fn message_url(gateway_url: &str, session_key: &str) -> String {
    format!(
        "{}/api/v1/sessions/{}/messages",
        gateway_url.trim_end_matches('/'),
        urlencoding::encode(session_key)
    )
}
