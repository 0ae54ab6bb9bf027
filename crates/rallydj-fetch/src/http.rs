//! HTTP transport for the rally live API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::{CacheMode, FetchError, ResponseCache, Transport};

const USER_AGENT: &str = concat!("rallydj/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport with an optional response cache.
pub struct HttpTransport {
    client: reqwest::Client,
    cache: ResponseCache,
}

impl HttpTransport {
    /// Create a transport with the default client and the given cache mode.
    pub fn new(mode: CacheMode) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Self::with_client(client, mode)
    }

    pub fn with_client(client: reqwest::Client, mode: CacheMode) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            cache: ResponseCache::new(mode)?,
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        if let Some(body) = self.cache.get(url)? {
            return Ok(serde_json::from_str(&body)?);
        }

        info!(url = %url, "fetching");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let value: Value = serde_json::from_str(&body)?;
        self.cache.put(url, &body)?;
        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(value)
    }
}
