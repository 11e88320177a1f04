//! HTTP peer transport.
//!
//! Speaks the overlay submission endpoint shape: a POST of the raw BEEF
//! bytes to `{domain}/submit` with the topic list JSON-encoded in the
//! `X-Topics` header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::domain::BoxError;
use crate::ports::PeerTransport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// `PeerTransport` over reqwest.
pub struct HttpPeerTransport {
    client: Client,
}

impl HttpPeerTransport {
    pub fn new() -> Result<Self, BoxError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Uses a caller-configured client, e.g. for custom timeouts or
    /// proxies.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn submit(&self, domain: &str, beef: &[u8], topics: &[String]) -> Result<(), BoxError> {
        let url = format!("{}/submit", domain.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/octet-stream")
            .header("X-Topics", serde_json::to_string(topics)?)
            .body(beef.to_vec())
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}
