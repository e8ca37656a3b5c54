// src/feed/providers/bluesky.rs
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;

use super::{build_url, fetch_text, get_json, validate_identifier};
use crate::config::BlueskyConfig;
use crate::feed::normalize::{content_or, non_empty, parse_timestamp};
use crate::feed::types::{AdapterError, Engagement, Item, ItemKind, Source, SourceAdapter};

const NO_CONTENT: &str = "No content";

#[derive(Debug, Deserialize)]
struct ResolveHandle {
    did: String,
}

#[derive(Debug, Deserialize)]
struct AuthorFeed {
    #[serde(default)]
    feed: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    post: PostView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostView {
    uri: String,
    author: Author,
    record: PostRecord,
    like_count: Option<u64>,
    repost_count: Option<u64>,
    reply_count: Option<u64>,
    embed: Option<Embed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Author {
    handle: String,
    display_name: Option<String>,
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord {
    text: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Embed {
    #[serde(default)]
    images: Vec<EmbedImage>,
}

#[derive(Debug, Deserialize)]
struct EmbedImage {
    thumb: Option<String>,
}

/// Recent posts of one Bluesky account.
pub struct BlueskyProvider {
    handle: String,
    mode: Mode,
}

enum Mode {
    /// Author-feed JSON, parsed as if it came from the AppView.
    Fixture(String),
    Http {
        client: reqwest::Client,
        api_base: String,
        page_size: u32,
    },
}

impl BlueskyProvider {
    pub fn from_config(cfg: &BlueskyConfig, client: reqwest::Client) -> Self {
        Self {
            handle: cfg.handle.clone(),
            mode: Mode::Http {
                client,
                api_base: cfg.api_base.clone(),
                page_size: cfg.page_size,
            },
        }
    }

    pub fn from_fixture_str(handle: &str, feed_json: &str) -> Self {
        Self {
            handle: handle.to_string(),
            mode: Mode::Fixture(feed_json.to_string()),
        }
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Map a `getAuthorFeed` response body to items. Permalinks are built
    /// from `handle` and the record key at the end of each post URI.
    pub fn parse_author_feed(handle: &str, body: &str) -> Result<Vec<Item>, AdapterError> {
        let t0 = std::time::Instant::now();
        let feed: AuthorFeed = serde_json::from_str(body)?;

        let mut out = Vec::with_capacity(feed.feed.len());
        for entry in feed.feed {
            if let Some(item) = map_post(handle, entry.post) {
                out.push(item);
            }
        }

        histogram!("feed_parse_ms", "source" => "bluesky")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    async fn resolve_did(
        &self,
        client: &reqwest::Client,
        api_base: &str,
    ) -> Result<String, AdapterError> {
        let url = build_url(
            api_base,
            &["xrpc", "com.atproto.identity.resolveHandle"],
            &[("handle", self.handle.as_str())],
        )?;
        let resolved: ResolveHandle = get_json(client, url, Source::Bluesky).await?;
        Ok(resolved.did)
    }
}

fn map_post(handle: &str, post: PostView) -> Option<Item> {
    let Some(timestamp) = post.record.created_at.as_deref().and_then(parse_timestamp) else {
        tracing::debug!(target: "feed", uri = %post.uri, "skipping post without valid createdAt");
        return None;
    };
    let rkey = post.uri.rsplit('/').next().unwrap_or_default();
    let url = format!("https://bsky.app/profile/{handle}/post/{rkey}");
    let author = non_empty(post.author.display_name.as_deref())
        .unwrap_or(&post.author.handle)
        .to_string();
    let images = post
        .embed
        .map(|e| e.images.into_iter().filter_map(|img| img.thumb).collect())
        .unwrap_or_default();

    Some(Item {
        id: post.uri,
        source: Source::Bluesky,
        kind: ItemKind::Post,
        title: None,
        content: content_or(post.record.text.as_deref(), NO_CONTENT),
        url,
        timestamp,
        author,
        avatar_url: post.author.avatar,
        engagement: Some(Engagement {
            likes: post.like_count.unwrap_or(0),
            reposts: post.repost_count.unwrap_or(0),
            replies: post.reply_count.unwrap_or(0),
        }),
        images,
        repo: None,
        pre_rendered: false,
    })
}

#[async_trait]
impl SourceAdapter for BlueskyProvider {
    async fn fetch(&self) -> Result<Vec<Item>, AdapterError> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_author_feed(&self.handle, body),
            Mode::Http {
                client,
                api_base,
                page_size,
            } => {
                validate_identifier("bluesky handle", &self.handle)?;
                let did = self.resolve_did(client, api_base).await?;
                let limit = page_size.to_string();
                let url = build_url(
                    api_base,
                    &["xrpc", "app.bsky.feed.getAuthorFeed"],
                    &[("actor", did.as_str()), ("limit", limit.as_str())],
                )?;
                let body = fetch_text(client, url, Source::Bluesky, "application/json").await?;
                Self::parse_author_feed(&self.handle, &body)
            }
        }
    }

    fn source(&self) -> Source {
        Source::Bluesky
    }
}
