//! Response cache keyed by URL, in memory or on disk.
//!
//! The cache holds raw response bodies with the time they were fetched. An
//! entry older than `expire_after` is a miss; it is overwritten by the next
//! successful fetch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::FetchError;

/// How responses are cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Disabled,
    Memory {
        expire_after: Duration,
    },
    /// One JSON file per URL under `dir`; survives process restarts.
    Disk {
        dir: PathBuf,
        expire_after: Duration,
    },
}

/// A cached response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub body: String,
}

impl CachedResponse {
    fn is_fresh(&self, now: DateTime<Utc>, expire_after: TimeDelta) -> bool {
        now.signed_duration_since(self.fetched_at) < expire_after
    }
}

enum Backend {
    Disabled,
    Memory(Mutex<HashMap<String, CachedResponse>>),
    Disk(PathBuf),
}

pub struct ResponseCache {
    backend: Backend,
    expire_after: TimeDelta,
}

impl ResponseCache {
    /// Build a cache for `mode`, creating the cache directory if needed.
    pub fn new(mode: CacheMode) -> Result<Self, FetchError> {
        let (backend, expire_after) = match mode {
            CacheMode::Disabled => (Backend::Disabled, Duration::ZERO),
            CacheMode::Memory { expire_after } => {
                (Backend::Memory(Mutex::new(HashMap::new())), expire_after)
            }
            CacheMode::Disk { dir, expire_after } => {
                std::fs::create_dir_all(&dir)?;
                (Backend::Disk(dir), expire_after)
            }
        };
        Ok(Self {
            backend,
            expire_after: TimeDelta::from_std(expire_after).unwrap_or(TimeDelta::MAX),
        })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, Backend::Disabled)
    }

    /// Fresh body for `url`, if any.
    pub fn get(&self, url: &str) -> Result<Option<String>, FetchError> {
        self.get_at(url, Utc::now())
    }

    pub fn put(&self, url: &str, body: &str) -> Result<(), FetchError> {
        self.put_at(url, body, Utc::now())
    }

    fn get_at(&self, url: &str, now: DateTime<Utc>) -> Result<Option<String>, FetchError> {
        let entry = match &self.backend {
            Backend::Disabled => return Ok(None),
            Backend::Memory(entries) => {
                let entries = entries.lock().unwrap_or_else(|e| e.into_inner());
                entries.get(url).cloned()
            }
            Backend::Disk(dir) => read_entry(&entry_path(dir, url))?,
        };
        match entry {
            Some(e) if e.url == url && e.is_fresh(now, self.expire_after) => {
                debug!(url, fetched_at = %e.fetched_at, "cache hit");
                Ok(Some(e.body))
            }
            Some(_) => {
                debug!(url, "cache entry stale");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put_at(&self, url: &str, body: &str, now: DateTime<Utc>) -> Result<(), FetchError> {
        let entry = CachedResponse {
            url: url.to_string(),
            fetched_at: now,
            body: body.to_string(),
        };
        match &self.backend {
            Backend::Disabled => {}
            Backend::Memory(entries) => {
                let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
                entries.insert(url.to_string(), entry);
            }
            Backend::Disk(dir) => {
                let path = entry_path(dir, url);
                std::fs::write(&path, serde_json::to_vec(&entry)?)?;
                debug!(path = %path.display(), "cached response written");
            }
        }
        Ok(())
    }
}

/// File name for a URL: every character outside `[A-Za-z0-9.-]` becomes `_`.
fn entry_path(dir: &Path, url: &str) -> PathBuf {
    let name: String = url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{name}.json"))
}

fn read_entry(path: &Path) -> Result<Option<CachedResponse>, FetchError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_slice(&bytes) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable cache entry");
            Ok(None)
        }
    }
}
