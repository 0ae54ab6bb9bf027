//! Offline transport serving canned documents.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{FetchError, Transport};

/// Serves fixed JSON documents by URL and records every request.
#[derive(Debug, Default)]
pub struct FixtureTransport {
    documents: HashMap<String, Value>,
    requests: Mutex<Vec<String>>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document served for `url`.
    pub fn with(mut self, url: impl Into<String>, document: Value) -> Self {
        self.insert(url, document);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, document: Value) {
        self.documents.insert(url.into(), document);
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        debug!(url, "serving fixture");
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn serves_documents_and_records_requests() {
        let transport = FixtureTransport::new().with("u1", json!([1]));
        assert_eq!(transport.fetch("u1").await.unwrap(), json!([1]));
        let err = transport.fetch("u2").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(url) if url == "u2"));
        assert_eq!(transport.requests(), ["u1", "u2"]);
    }
}
