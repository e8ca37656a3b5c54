// src/feed/controller.rs
//! Filter/render state machine driving what the presentation layer shows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::FeedConfig;
use crate::feed::aggregator::Aggregator;
use crate::feed::staleness::Staleness;
use crate::feed::types::{Item, Source, UnknownSource};

/// Static, user-facing message for the error state.
pub const ERROR_MESSAGE: &str = "Error loading feeds. Please try again later.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedFilter {
    #[default]
    All,
    Source(Source),
}

impl FeedFilter {
    pub fn matches(self, item: &Item) -> bool {
        match self {
            FeedFilter::All => true,
            FeedFilter::Source(s) => item.source == s,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedFilter::All => "all",
            FeedFilter::Source(s) => s.as_str(),
        }
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedFilter {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(FeedFilter::All);
        }
        s.parse::<Source>().map(FeedFilter::Source)
    }
}

impl Serialize for FeedFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Rendered(FeedFilter),
    Error,
}

impl ViewState {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewState::Loading => "loading",
            ViewState::Rendered(_) => "rendered",
            ViewState::Error => "error",
        }
    }
}

impl Serialize for ViewState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What the presentation layer needs for one render pass.
#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub state: ViewState,
    pub filter: FeedFilter,
    pub items: Vec<Item>,
    pub total: usize,
    pub staleness: Option<Staleness>,
    pub message: Option<&'static str>,
}

impl FeedView {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct FeedController {
    aggregator: Option<Arc<Aggregator>>,
    state: ViewState,
    filter: FeedFilter,
    items: Vec<Item>,
    last_updated: Option<DateTime<Utc>>,
}

impl FeedController {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator: Some(aggregator),
            state: ViewState::Loading,
            filter: FeedFilter::All,
            items: Vec::new(),
            last_updated: None,
        }
    }

    /// Initialize from the startup config. Any failure here leaves the
    /// controller in the error state instead of panicking.
    pub fn init(config: anyhow::Result<FeedConfig>) -> Self {
        let built = config.and_then(|cfg| Aggregator::from_config(&cfg).map_err(Into::into));
        match built {
            Ok(aggregator) => Self::new(Arc::new(aggregator)),
            Err(e) => {
                tracing::error!(target: "feed", error = ?e, "feed initialization failed");
                Self {
                    aggregator: None,
                    state: ViewState::Error,
                    filter: FeedFilter::All,
                    items: Vec::new(),
                    last_updated: None,
                }
            }
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn filter(&self) -> FeedFilter {
        self.filter
    }

    /// Everything loaded, regardless of filter.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn aggregator(&self) -> Option<&Arc<Aggregator>> {
        self.aggregator.as_ref()
    }

    pub async fn load(&mut self, force_refresh: bool) -> ViewState {
        self.state = ViewState::Loading;
        let Some(aggregator) = self.aggregator.clone() else {
            self.state = ViewState::Error;
            return self.state;
        };

        match aggregator.load_entry(force_refresh).await {
            Ok(entry) => {
                self.items = entry.items;
                self.last_updated = Some(entry.timestamp);
                self.state = ViewState::Rendered(self.filter);
            }
            Err(e) => {
                tracing::error!(target: "feed", error = %e, "error loading feeds");
                self.items.clear();
                self.last_updated = None;
                self.state = ViewState::Error;
            }
        }
        self.state
    }

    /// Drop the cached snapshot and fetch again.
    pub async fn refresh(&mut self) -> ViewState {
        if let Some(aggregator) = &self.aggregator {
            aggregator.clear_cache().await;
        }
        self.load(true).await
    }

    pub fn select_filter(&mut self, filter: FeedFilter) {
        self.filter = filter;
        if let ViewState::Rendered(_) = self.state {
            self.state = ViewState::Rendered(filter);
        }
    }

    pub fn visible(&self) -> Vec<&Item> {
        match self.state {
            ViewState::Rendered(filter) => self.items.iter().filter(|i| filter.matches(i)).collect(),
            _ => Vec::new(),
        }
    }

    /// `None` until a snapshot is shown, and again once loading failed.
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<Staleness> {
        if self.state == ViewState::Error {
            return None;
        }
        let ttl = self.aggregator.as_ref()?.cache().ttl();
        self.last_updated.map(|t| Staleness::at(t, ttl, now))
    }

    pub fn view(&self, now: DateTime<Utc>) -> FeedView {
        let items: Vec<Item> = self.visible().into_iter().cloned().collect();
        FeedView {
            state: self.state,
            filter: self.filter,
            total: self.items.len(),
            items,
            staleness: self.staleness(now),
            message: matches!(self.state, ViewState::Error).then_some(ERROR_MESSAGE),
        }
    }
}
