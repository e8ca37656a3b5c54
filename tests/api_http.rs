// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::Value as Json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

use social_feed::feed::providers::bluesky::BlueskyProvider;
use social_feed::feed::providers::github::GithubProvider;
use social_feed::feed::{
    AdapterError, Aggregator, FeedCache, FeedController, Item, ItemKind, Source, SourceAdapter,
};
use social_feed::{api, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

fn fixture_state() -> AppState {
    let bsky = BlueskyProvider::from_fixture_str(
        "alice.bsky.social",
        include_str!("fixtures/bluesky_author_feed.json"),
    );
    let gh = GithubProvider::from_fixture_str("alice", include_str!("fixtures/github_events.json"));
    let agg = Aggregator::new(vec![Box::new(bsky), Box::new(gh)], FeedCache::in_memory());
    AppState::new(FeedController::new(Arc::new(agg)))
}

fn test_router() -> Router {
    api::router(fixture_state())
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf8"))
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, body) = get(test_router(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn feed_json_loads_lazily_and_lists_everything() {
    let (status, body) = get(test_router(), "/feed").await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(v["state"], "rendered");
    assert_eq!(v["filter"], "all");
    assert_eq!(v["total"], 8);
    let items = v["items"].as_array().unwrap();
    assert_eq!(items.len(), 8);
    assert_eq!(items[0]["source"], "bluesky");
    assert_eq!(items[0]["type"], "post");
    assert!(v["staleness"]["remaining_secs"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn feed_filter_query_narrows_items() {
    let (status, body) = get(test_router(), "/feed?filter=github").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(v["filter"], "github");
    let items = v["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i["source"] == "github"));
}

#[tokio::test]
async fn unknown_filter_is_bad_request() {
    let (status, body) = get(test_router(), "/feed?filter=mastodon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("mastodon"));
}

#[tokio::test]
async fn filter_persists_across_requests_on_shared_state() {
    let state = fixture_state();
    let _ = get(api::router(state.clone()), "/feed?filter=bluesky").await;
    let (_, body) = get(api::router(state), "/feed").await;
    let v: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(v["filter"], "bluesky");
    assert_eq!(v["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn feed_html_wraps_status_and_items() {
    let (status, body) = get(test_router(), "/feed/html?filter=all").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(r#"<div id="feed-status">"#));
    assert!(body.contains("Last updated:"));
    assert_eq!(body.matches("<article").count(), 8);
    // fixture text with markup arrives escaped
    assert!(body.contains("&lt;b&gt;finally&lt;/b&gt; &amp; happy"));
    assert!(body.contains("Add &lt;script&gt; sanitizing"));
}

#[tokio::test]
async fn refresh_endpoint_returns_fresh_view() {
    let app = test_router();
    let req = Request::builder()
        .method("POST")
        .uri("/feed/refresh")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["state"], "rendered");
    assert_eq!(v["total"], 8);
}

#[tokio::test]
async fn broken_config_reports_error_view() {
    let controller = FeedController::init(Err(anyhow::anyhow!("bad config")));
    let app = api::router(AppState::new(controller));

    let (status, body) = get(app.clone(), "/feed").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_str(&body).unwrap();
    assert_eq!(v["state"], "error");
    assert_eq!(v["message"], "Error loading feeds. Please try again later.");

    let (_, html) = get(app, "/feed/html").await;
    assert!(html.contains("feed-error"));
    assert!(!html.contains("Last updated"));
}

/// One fresh post per fetch, counting how often the sources were hit.
struct CountingSource {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter for CountingSource {
    async fn fetch(&self) -> Result<Vec<Item>, AdapterError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(vec![Item {
            id: format!("at://did:plc:x/app.bsky.feed.post/{n}"),
            source: Source::Bluesky,
            kind: ItemKind::Post,
            title: None,
            content: format!("post {n}"),
            url: format!("https://bsky.app/profile/x/post/{n}"),
            timestamp: chrono::Utc::now(),
            author: "x".into(),
            avatar_url: None,
            engagement: None,
            images: vec![],
            repo: None,
            pre_rendered: false,
        }])
    }

    fn source(&self) -> Source {
        Source::Bluesky
    }
}

fn counting_router(cache: FeedCache) -> (Router, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        calls: calls.clone(),
    };
    let agg = Aggregator::new(vec![Box::new(source)], cache);
    let app = api::router(AppState::new(FeedController::new(Arc::new(agg))));
    (app, calls)
}

#[tokio::test]
async fn fresh_snapshot_is_served_without_refetch() {
    let (app, calls) = counting_router(FeedCache::in_memory());
    for _ in 0..3 {
        let (status, _) = get(app.clone(), "/feed").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_snapshot_is_refetched_on_next_request() {
    let ttl = chrono::Duration::milliseconds(300);
    let (app, calls) = counting_router(FeedCache::in_memory().with_ttl(ttl));

    let (_, first) = get(app.clone(), "/feed").await;
    let first: Json = serde_json::from_str(&first).unwrap();
    assert_eq!(first["items"][0]["content"], "post 1");

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;

    let (status, second) = get(app, "/feed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let second: Json = serde_json::from_str(&second).unwrap();
    assert_eq!(second["items"][0]["content"], "post 2");
}
