// src/config/feed.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::types::Source;

pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";

const DEFAULT_TOML_PATH: &str = "config/feed.toml";
const DEFAULT_JSON_PATH: &str = "config/feed.json";

fn default_true() -> bool {
    true
}
fn default_bluesky_base() -> String {
    "https://public.api.bsky.app".to_string()
}
fn default_page_size() -> u32 {
    20
}
fn default_github_base() -> String {
    "https://api.github.com".to_string()
}
fn default_per_page() -> u32 {
    30
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_user_agent() -> String {
    concat!("social-feed-aggregator/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/feed")
}

/// Startup configuration. Built once and passed by value/reference; never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub bluesky: BlueskyConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default)]
    pub handle: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bluesky_base")]
    pub api_base: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            handle: String::new(),
            enabled: true,
            api_base: default_bluesky_base(),
            page_size: default_page_size(),
        }
    }
}

/// What to do with GitHub event kinds outside the known set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownEventPolicy {
    /// Exclude them (allow-list).
    #[default]
    Drop,
    /// Map them to a generic "activity" item.
    Generic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_github_base")]
    pub api_base: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub unknown_events: UnknownEventPolicy,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            enabled: true,
            api_base: default_github_base(),
            per_page: default_per_page(),
            unknown_events: UnknownEventPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

impl FeedConfig {
    /// Whether `source` should be queried: enabled and with an identifier.
    pub fn is_active(&self, source: Source) -> bool {
        match source {
            Source::Bluesky => self.bluesky.enabled && !self.bluesky.handle.is_empty(),
            Source::Github => self.github.enabled && !self.github.username.is_empty(),
        }
    }

    /// Active sources in declaration order.
    pub fn enabled_sources(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| self.is_active(*s))
            .collect()
    }

    fn sanitize(mut self) -> Self {
        self.bluesky.handle = self.bluesky.handle.trim().trim_start_matches('@').to_string();
        self.github.username = self.github.username.trim().to_string();
        if self.bluesky.page_size == 0 {
            self.bluesky.page_size = default_page_size();
        }
        if self.github.per_page == 0 {
            self.github.per_page = default_per_page();
        }
        self
    }
}

/// Load config from an explicit path. Supports TOML or JSON.
pub fn load_config_from(path: &Path) -> Result<FeedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing feed config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $FEED_CONFIG_PATH
/// 2) config/feed.toml
/// 3) config/feed.json
/// 4) defaults (no identifiers, so every source is inactive)
pub fn load_config_default() -> Result<FeedConfig> {
    if let Ok(p) = std::env::var(ENV_FEED_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("FEED_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(FeedConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FeedConfig> {
    let looks_json = s.trim_start().starts_with('{');
    let cfg = match hint_ext {
        "json" => serde_json::from_str::<FeedConfig>(s)?,
        "toml" => toml::from_str::<FeedConfig>(s)?,
        _ if looks_json => serde_json::from_str::<FeedConfig>(s)?,
        _ => toml::from_str::<FeedConfig>(s)
            .map_err(|e| anyhow!("unsupported feed config format: {e}"))?,
    };
    Ok(cfg.sanitize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_parse_to_same_config() {
        let toml = r#"
[bluesky]
handle = " @alice.bsky.social "

[github]
username = "alice"
unknown_events = "generic"
"#;
        let json = r#"{"bluesky":{"handle":"alice.bsky.social"},"github":{"username":"alice","unknown_events":"generic"}}"#;
        let a = parse_config(toml, "toml").unwrap();
        let b = parse_config(json, "").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bluesky.handle, "alice.bsky.social");
        assert_eq!(a.github.per_page, 30);
        assert_eq!(a.github.unknown_events, UnknownEventPolicy::Generic);
    }

    #[test]
    fn empty_identifier_disables_source() {
        let cfg = parse_config(
            r#"{"bluesky":{"handle":"  ","enabled":true},"github":{"username":"bob"}}"#,
            "json",
        )
        .unwrap();
        assert_eq!(cfg.enabled_sources(), vec![Source::Github]);
    }

    #[test]
    fn disabled_flag_wins_over_identifier() {
        let cfg = parse_config(
            r#"
[bluesky]
handle = "alice.bsky.social"
enabled = false
[github]
username = "alice"
"#,
            "toml",
        )
        .unwrap();
        assert!(!cfg.is_active(Source::Bluesky));
        assert!(cfg.is_active(Source::Github));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_config("{not json", "json").is_err());
        assert!(parse_config("[[[", "").is_err());
    }
}
