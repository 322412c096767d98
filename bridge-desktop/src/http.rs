//! Download Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{DownloadRequest, DownloadResponse, HttpClient, RetryPolicy},
};
use futures_util::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Reqwest-based download client
///
/// - Connection pooling via reqwest
/// - Connection failures retried with exponential backoff
/// - Response bodies streamed chunk by chunk to disk
pub struct ReqwestHttpClient {
    client: Client,
    retry_policy: RetryPolicy,
}

impl ReqwestHttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent("player-core/0.1.0")
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default reqwest client");
                Client::new()
            });

        Self::with_client(client)
    }

    /// Create a new client around a preconfigured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn build_request(&self, request: &DownloadRequest) -> reqwest::RequestBuilder {
        let mut req = self.client.get(&request.from_url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Send the request, retrying only failures that happened before a status
    /// line was received.
    async fn send_with_retry(&self, request: &DownloadRequest) -> Result<reqwest::Response> {
        let policy = &self.retry_policy;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts = policy.max_attempts,
                url = %request.from_url,
                "Starting download request"
            );

            match self.build_request(request).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(error = %e, attempt, "Download request failed");

                    let error = if e.is_timeout() {
                        BridgeError::OperationFailed("Request timed out".to_string())
                    } else if e.is_connect() {
                        BridgeError::OperationFailed(format!("Connection failed: {}", e))
                    } else {
                        BridgeError::OperationFailed(e.to_string())
                    };

                    if attempt >= policy.max_attempts || !(e.is_connect() || e.is_timeout()) {
                        return Err(error);
                    }
                }
            }

            let delay = policy.delay_for(attempt);
            debug!(delay_ms = delay.as_millis(), "Retrying after delay");
            sleep(delay).await;
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn download_file(&self, request: DownloadRequest) -> Result<DownloadResponse> {
        let response = self.send_with_retry(&request).await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            debug!(status, url = %request.from_url, "Download returned non-success status");
            return Ok(DownloadResponse::new(status, 0));
        }

        if let Some(parent) = request.to_file.parent() {
            fs::create_dir_all(parent).await.map_err(BridgeError::Io)?;
        }

        let mut file = fs::File::create(&request.to_file)
            .await
            .map_err(BridgeError::Io)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| BridgeError::OperationFailed(e.to_string()))?;
            file.write_all(&chunk).await.map_err(BridgeError::Io)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(BridgeError::Io)?;

        debug!(status, bytes = written, path = ?request.to_file, "Download finished");
        Ok(DownloadResponse::new(status, written))
    }
}
