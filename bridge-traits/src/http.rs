//! HTTP Transfer Abstraction
//!
//! Provides the remote-to-local file transfer used for offline downloads.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Request to copy a remote resource onto the local filesystem.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub from_url: String,
    pub to_file: PathBuf,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl DownloadRequest {
    pub fn new(from_url: impl Into<String>, to_file: impl Into<PathBuf>) -> Self {
        Self {
            from_url: from_url.into(),
            to_file: to_file.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Outcome of a completed transfer.
///
/// A non-2xx status is reported here rather than as an error; only transport
/// failures (DNS, TLS, broken connection, disk write) surface as `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResponse {
    pub status_code: u16,
    pub bytes_written: u64,
}

impl DownloadResponse {
    pub fn new(status_code: u16, bytes_written: u64) -> Self {
        Self {
            status_code,
            bytes_written,
        }
    }

    /// The offline store only accepts a plain `200 OK`.
    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of connection attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub use_exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            use_exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before attempt number `attempt` (1-based, counting retries only).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.use_exponential_backoff {
            return self.base_delay;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Async transfer client trait
///
/// Implementations stream the response body into `to_file`, creating or
/// truncating it. They should handle connection pooling, TLS validation and
/// retrying connection failures; they must not retry on a received status.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{DownloadRequest, HttpClient};
///
/// async fn fetch(client: &dyn HttpClient) -> Result<bool> {
///     let request = DownloadRequest::new("https://cdn.example.com/a.mp3", "/data/downloads/a.mp3");
///     Ok(client.download_file(request).await?.is_ok())
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Download `from_url` into `to_file`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    /// - The destination cannot be written
    async fn download_file(&self, request: DownloadRequest) -> Result<DownloadResponse>;
}
