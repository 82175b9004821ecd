//! The read side: fetch stored content from an HTTP gateway by CID.
//!
//! Reads need no ledger connection. `GET {base}{cid}` returns the bytes
//! exactly as stored. Gateways are not trusted blindly:
//! [`GatewayReader::read_verified`] recomputes the CID of what came back.

mod cache;

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use crate::linked_data::{compute_cid, ContentId};

pub use cache::{ReadCache, DEFAULT_CACHE_TTL};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway did not respond within {0:?}")]
    Timeout(Duration),
    #[error("gateway returned {0} for {1}")]
    Status(StatusCode, String),
    #[error("failed to decode gateway response: {0}")]
    Decode(String),
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid gateway url: {0}")]
    Url(#[from] url::ParseError),
    #[error("gateway returned content for {actual}, expected {expected}")]
    Integrity {
        expected: ContentId,
        actual: ContentId,
    },
}

impl GatewayError {
    /// Reads are idempotent, so anything that might clear up on its own is
    /// worth retrying. A 404 shortly after a write usually means the
    /// gateway has not indexed the content yet.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Request(_) => true,
            Self::Status(status, _) => {
                status.is_server_error()
                    || *status == StatusCode::NOT_FOUND
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Decode(_) | Self::Url(_) | Self::Integrity { .. } => false,
        }
    }
}

/// HTTP reader for gateway content.
#[derive(Debug, Clone)]
pub struct GatewayReader {
    client: reqwest::Client,
    timeout: Duration,
    cache: Option<ReadCache>,
}

impl GatewayReader {
    pub fn new() -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_READ_TIMEOUT,
            cache: None,
        }
    }

    /// Default timeout for reads that do not pass their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: ReadCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> Option<&ReadCache> {
        self.cache.as_ref()
    }

    pub async fn read_bytes(&self, url: &str) -> Result<Bytes, GatewayError> {
        self.read_bytes_with_timeout(url, self.timeout).await
    }

    /// GET `url` and return the whole body. The request is abandoned once
    /// `timeout` elapses.
    #[tracing::instrument(name = "read_bytes", skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn read_bytes_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Bytes, GatewayError> {
        Url::parse(url)?;

        if let Some(bytes) = self.cache.as_ref().and_then(|cache| cache.get(url)) {
            tracing::debug!(len = bytes.len(), "served from read cache");
            return Ok(bytes);
        }

        let fetch = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| request_error(e, timeout))?;
            let status = response.status();
            if !status.is_success() {
                return Err(GatewayError::Status(status, url.to_string()));
            }
            response.bytes().await.map_err(|e| request_error(e, timeout))
        };

        let bytes = match tokio::time::timeout(timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(timeout)),
        }
        .inspect_err(|e| tracing::warn!(error = %e, "gateway read failed"))?;

        tracing::info!(len = bytes.len(), "read from gateway");
        if let Some(cache) = &self.cache {
            cache.insert(url, bytes.clone());
        }
        Ok(bytes)
    }

    pub async fn read_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        self.read_json_with_timeout(url, self.timeout).await
    }

    /// Read `url` and parse the body as UTF-8 JSON.
    pub async fn read_json_with_timeout<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, GatewayError> {
        let bytes = self.read_bytes_with_timeout(url, timeout).await?;
        decode_json(&bytes)
    }

    /// Read `{base}{cid}` and check the body hashes to `cid`.
    pub async fn read_verified(
        &self,
        gateway_base_url: &str,
        cid: &ContentId,
    ) -> Result<Bytes, GatewayError> {
        let url = format!("{gateway_base_url}{cid}");
        let bytes = self.read_bytes(&url).await?;
        let actual = compute_cid(&bytes);
        if actual != *cid {
            if let Some(cache) = &self.cache {
                cache.invalidate(&url);
            }
            tracing::error!(expected = %cid, %actual, %url, "gateway content does not match cid");
            return Err(GatewayError::Integrity {
                expected: *cid,
                actual,
            });
        }
        Ok(bytes)
    }
}

fn request_error(e: reqwest::Error, timeout: Duration) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(timeout)
    } else {
        GatewayError::Request(e)
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GatewayError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| GatewayError::Decode(format!("response is not utf-8: {e}")))?;
    serde_json::from_str(text).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Read `url` with a one-off reader.
pub async fn read_bytes(url: &str, timeout: Duration) -> Result<Bytes, GatewayError> {
    GatewayReader::new()?
        .read_bytes_with_timeout(url, timeout)
        .await
}

/// Read `url` as JSON with a one-off reader.
pub async fn read_json<T: DeserializeOwned>(
    url: &str,
    timeout: Duration,
) -> Result<T, GatewayError> {
    GatewayReader::new()?
        .read_json_with_timeout(url, timeout)
        .await
}
