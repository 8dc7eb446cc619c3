//! # Image Relay
//!
//! Fetches remote images and hands their bytes back as readable data. The
//! HTTP server exposes the same fetch as `GET /api/imageProxy?url=...` with a
//! permissive `Access-Control-Allow-Origin` header; in-process callers use
//! [`ImageRelay::route`] directly.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::RoundelError;
use crate::source::ImageRef;

/// Content type used when the upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Path of the relay endpoint.
pub const RELAY_PATH: &str = "/api/imageProxy";

/// HTTP client settings for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("roundel/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Bytes fetched from upstream plus the content type to re-serve them with.
#[derive(Debug, Clone)]
pub struct RelayedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Anything that can fetch a remote image.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RelayedImage, RoundelError>;

    /// Make a reference pixel-readable: remote URLs are fetched and turned
    /// into data URLs, other references pass through unchanged.
    async fn route(&self, reference: &ImageRef) -> Result<ImageRef, RoundelError> {
        match reference {
            ImageRef::Url(url) => {
                let relayed = self.fetch(url).await?;
                Ok(ImageRef::data_url(&relayed.content_type, &relayed.bytes))
            }
            other => Ok(other.clone()),
        }
    }
}

/// reqwest-backed relay.
#[derive(Debug, Clone)]
pub struct ImageRelay {
    client: reqwest::Client,
}

impl ImageRelay {
    pub fn new(config: RelayConfig) -> Result<Self, RoundelError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RoundelError::ProxyFetch(format!("HTTP client error: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for ImageRelay {
    async fn fetch(&self, url: &str) -> Result<RelayedImage, RoundelError> {
        log::debug!("relaying {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RoundelError::ProxyFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoundelError::ProxyFetch(format!(
                "Failed to fetch image: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RoundelError::ProxyFetch(format!("Failed to read body: {}", e)))?;

        Ok(RelayedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

/// Build the relay endpoint URL for `target` on the server at `base`.
pub fn relay_url(base: &str, target: &str) -> Result<String, RoundelError> {
    let endpoint = format!("{}{}", base.trim_end_matches('/'), RELAY_PATH);
    let url = reqwest::Url::parse_with_params(&endpoint, &[("url", target)])
        .map_err(|e| RoundelError::InvalidParameter(format!("Invalid relay base {}: {}", base, e)))?;
    Ok(url.to_string())
}
