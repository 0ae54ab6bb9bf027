//! Transport layer: `GET url -> JSON`, optionally served from a response cache.

mod cache;
mod error;
mod fixture;
#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

pub use cache::{CacheMode, CachedResponse, ResponseCache};
pub use error::FetchError;
pub use fixture::FixtureTransport;
#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Fetches one JSON document per URL.
///
/// Implementations own their timeout, caching and error policy; callers never
/// retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}
