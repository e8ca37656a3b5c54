// src/feed/cache.rs
//! Single-entry snapshot cache over a small key-value store.
//!
//! The store holds one JSON envelope `{timestamp, items}` under
//! [`CACHE_KEY`]. Reads never fail outward: a missing, corrupt or expired
//! entry is simply absent (corrupt and expired entries are also removed).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::feed::types::Item;

pub const CACHE_KEY: &str = "social_feed_cache";

/// Maximum age of a snapshot.
pub const CACHE_TTL: Duration = Duration::hours(24);

/// Minimal persistent key-value surface.
pub trait KvStore: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.sync_all()?;
        fs::rename(tmp, path)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process store, used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.map().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.map().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.map().remove(key);
        Ok(())
    }
}

/// Persisted snapshot of the last successful aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "data")]
    pub items: Vec<Item>,
}

impl CacheEntry {
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.timestamp
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) >= ttl
    }
}

/// Typed view over the store: one key, one envelope, fixed TTL.
#[derive(Clone)]
pub struct FeedCache {
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            ttl: CACHE_TTL,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self) -> Option<CacheEntry> {
        self.get_at(Utc::now())
    }

    pub fn get_at(&self, now: DateTime<Utc>) -> Option<CacheEntry> {
        let raw = match self.store.read(CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "feed::cache", error = %e, "cache read error");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(target: "feed::cache", error = %e, "malformed cache entry, clearing");
                self.clear();
                return None;
            }
        };

        if entry.is_expired_at(now, self.ttl) {
            tracing::debug!(target: "feed::cache", written = %entry.timestamp, "cache entry expired");
            self.clear();
            return None;
        }
        Some(entry)
    }

    pub fn set(&self, items: &[Item]) -> io::Result<CacheEntry> {
        self.set_at(items, Utc::now())
    }

    /// Replace the stored snapshot wholesale.
    pub fn set_at(&self, items: &[Item], now: DateTime<Utc>) -> io::Result<CacheEntry> {
        let entry = CacheEntry {
            timestamp: now,
            items: items.to_vec(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.store.write(CACHE_KEY, &json)?;
        Ok(entry)
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(CACHE_KEY) {
            tracing::warn!(target: "feed::cache", error = %e, "cache clear error");
        }
    }
}

impl std::fmt::Debug for FeedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedCache").field("ttl", &self.ttl).finish()
    }
}
