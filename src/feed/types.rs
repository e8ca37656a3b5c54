// src/feed/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External activity provider. Declaration order is the merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Bluesky,
    Github,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Bluesky, Source::Github];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Bluesky => "bluesky",
            Source::Github => "github",
        }
    }

    /// Human label used in links ("View on GitHub").
    pub fn label(self) -> &'static str {
        match self {
            Source::Bluesky => "Bluesky",
            Source::Github => "GitHub",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Source::ALL
            .into_iter()
            .find(|src| src.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| UnknownSource(t.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown source `{0}`")]
pub struct UnknownSource(pub String);

/// Activity tag of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Push,
    Create,
    Pr,
    Issue,
    Release,
    Star,
    Fork,
    Activity,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Push => "push",
            ItemKind::Create => "create",
            ItemKind::Pr => "pr",
            ItemKind::Issue => "issue",
            ItemKind::Release => "release",
            ItemKind::Star => "star",
            ItemKind::Fork => "fork",
            ItemKind::Activity => "activity",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reaction counters for sources that have them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub reposts: u64,
    #[serde(default)]
    pub replies: u64,
}

/// One normalized unit of activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub source: Source,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// `content` is trusted markup and must not be escaped.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pre_rendered: bool,
}

impl Item {
    /// Globally unique key (`source:id`).
    pub fn key(&self) -> String {
        format!("{}:{}", self.source, self.id)
    }
}

/// Why an adapter could not produce items.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The request itself could not be built (bad identifier, bad base url).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AdapterError {
    /// Fatal errors are configuration problems; everything else means the
    /// source is temporarily unavailable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AdapterError::InvalidRequest(_))
    }
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Item>, AdapterError>;

    fn source(&self) -> Source;

    fn name(&self) -> &'static str {
        self.source().as_str()
    }
}
