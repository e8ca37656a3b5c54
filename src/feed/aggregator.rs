// src/feed/aggregator.rs
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::FeedConfig;
use crate::feed::cache::{CacheEntry, FeedCache, FileStore};
use crate::feed::providers::{bluesky::BlueskyProvider, github::GithubProvider};
use crate::feed::types::{AdapterError, Item, Source, SourceAdapter};
use crate::feed::ensure_metrics_described;

/// Failures that must reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{origin} request could not be built: {error}")]
    InvalidRequest {
        origin: Source,
        #[source]
        error: AdapterError,
    },
}

/// Merges every configured source into one timeline, behind the cache.
pub struct Aggregator {
    adapters: Vec<Box<dyn SourceAdapter>>,
    cache: FeedCache,
    in_flight: Mutex<()>,
    refreshes: AtomicU64,
}

impl Aggregator {
    pub fn new(adapters: Vec<Box<dyn SourceAdapter>>, cache: FeedCache) -> Self {
        ensure_metrics_described();
        Self {
            adapters,
            cache,
            in_flight: Mutex::new(()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Build the HTTP client and one adapter per active source. Sources
    /// that are disabled or lack an identifier are never constructed.
    pub fn from_config(cfg: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.http.user_agent.as_str())
            .connect_timeout(Duration::from_secs(cfg.http.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.http.timeout_secs))
            .build()
            .map_err(|e| FeedError::Config(format!("http client: {e}")))?;

        let mut adapters: Vec<Box<dyn SourceAdapter>> = Vec::new();
        for source in cfg.enabled_sources() {
            match source {
                Source::Bluesky => adapters.push(Box::new(BlueskyProvider::from_config(
                    &cfg.bluesky,
                    client.clone(),
                ))),
                Source::Github => adapters.push(Box::new(GithubProvider::from_config(
                    &cfg.github,
                    client.clone(),
                ))),
            }
        }

        let cache = FeedCache::new(Arc::new(FileStore::new(cfg.cache.dir.clone())));
        tracing::info!(target: "feed", sources = ?cfg.enabled_sources(), "aggregator configured");
        Ok(Self::new(adapters, cache))
    }

    /// Sources that will be queried, in merge order.
    pub fn sources(&self) -> Vec<Source> {
        self.adapters.iter().map(|a| a.source()).collect()
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub async fn load(&self, force_refresh: bool) -> Result<Vec<Item>, FeedError> {
        self.load_entry(force_refresh).await.map(|e| e.items)
    }

    /// Cached snapshot when fresh, otherwise fetch + merge + store.
    ///
    /// Loads are serialized; a caller that waited on another load which
    /// refreshed the cache takes that result instead of fetching again.
    pub async fn load_entry(&self, force_refresh: bool) -> Result<CacheEntry, FeedError> {
        let seen = self.refreshes.load(Ordering::Acquire);
        let _guard = self.in_flight.lock().await;
        let refreshed_while_waiting = self.refreshes.load(Ordering::Acquire) != seen;

        if !force_refresh || refreshed_while_waiting {
            if let Some(entry) = self.cached().await {
                counter!("feed_cache_hits_total").increment(1);
                tracing::debug!(target: "feed", items = entry.items.len(), "serving cached feed");
                return Ok(entry);
            }
        }
        counter!("feed_cache_misses_total").increment(1);

        let items = self.fetch_all().await?;
        let entry = self.store(items).await;
        self.refreshes.fetch_add(1, Ordering::AcqRel);

        counter!("feed_refresh_total").increment(1);
        gauge!("feed_last_refresh_ts").set(entry.timestamp.timestamp() as f64);
        tracing::info!(target: "feed", items = entry.items.len(), "feed refreshed");
        Ok(entry)
    }

    /// Drop the stored snapshot so the next load fetches.
    pub async fn clear_cache(&self) {
        let cache = self.cache.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.clear()).await {
            tracing::warn!(target: "feed::cache", error = %e, "cache clear task failed");
        }
    }

    // Store I/O is blocking (file reads, fsync), so it runs off the runtime threads.
    async fn cached(&self) -> Option<CacheEntry> {
        let cache = self.cache.clone();
        match tokio::task::spawn_blocking(move || cache.get()).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(target: "feed::cache", error = %e, "cache read task failed");
                None
            }
        }
    }

    /// Persist a fresh snapshot. A failed write is logged; the snapshot is
    /// still returned so the caller can render it.
    async fn store(&self, items: Vec<Item>) -> CacheEntry {
        let entry = CacheEntry {
            timestamp: chrono::Utc::now(),
            items,
        };
        let cache = self.cache.clone();
        let snapshot = entry.clone();
        match tokio::task::spawn_blocking(move || cache.set_at(&snapshot.items, snapshot.timestamp))
            .await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(target: "feed::cache", error = %e, "cache write error"),
            Err(e) => tracing::warn!(target: "feed::cache", error = %e, "cache write task failed"),
        }
        entry
    }

    /// Fan out to every adapter, then merge in declaration order.
    async fn fetch_all(&self) -> Result<Vec<Item>, FeedError> {
        let fetches = self.adapters.iter().map(|adapter| async move {
            let t0 = std::time::Instant::now();
            let res = adapter.fetch().await;
            histogram!("feed_fetch_ms", "source" => adapter.name())
                .record(t0.elapsed().as_secs_f64() * 1_000.0);
            (adapter.source(), res)
        });
        let results = join_all(fetches).await;

        let mut merged = Vec::new();
        for (source, res) in results {
            match res {
                Ok(mut items) => {
                    counter!("feed_adapter_items_total", "source" => source.as_str())
                        .increment(items.len() as u64);
                    merged.append(&mut items);
                }
                Err(error) if error.is_fatal() => {
                    tracing::error!(target: "feed", %source, %error, "source request could not be built");
                    return Err(FeedError::InvalidRequest {
                        origin: source,
                        error,
                    });
                }
                Err(error) => {
                    tracing::warn!(target: "feed", %source, error = ?error, "source unavailable, continuing without it");
                    counter!("feed_adapter_errors_total", "source" => source.as_str()).increment(1);
                }
            }
        }

        sort_newest_first(&mut merged);
        Ok(merged)
    }
}

/// Newest first; equal timestamps keep their relative order.
pub fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("sources", &self.sources())
            .field("cache", &self.cache)
            .finish()
    }
}
