// src/feed/mod.rs
pub mod aggregator;
pub mod cache;
pub mod controller;
pub mod normalize;
pub mod providers;
pub mod render;
pub mod staleness;
pub mod types;

pub use aggregator::{sort_newest_first, Aggregator, FeedError};
pub use cache::{CacheEntry, FeedCache, FileStore, KvStore, MemoryStore, CACHE_KEY, CACHE_TTL};
pub use controller::{FeedController, FeedFilter, FeedView, ViewState, ERROR_MESSAGE};
pub use types::{AdapterError, Engagement, Item, ItemKind, Source, SourceAdapter};

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_adapter_items_total",
            "Items returned by source adapters."
        );
        describe_counter!(
            "feed_adapter_errors_total",
            "Adapter fetches that failed and were skipped."
        );
        describe_counter!(
            "feed_http_errors_total",
            "Transport-level HTTP failures per source."
        );
        describe_counter!("feed_cache_hits_total", "Loads served from the cache.");
        describe_counter!(
            "feed_cache_misses_total",
            "Loads that had to fetch from the sources."
        );
        describe_counter!("feed_refresh_total", "Completed aggregations.");
        describe_histogram!("feed_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_histogram!("feed_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!(
            "feed_last_refresh_ts",
            "Unix ts of the last successful aggregation."
        );
    });
}
