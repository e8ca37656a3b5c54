use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::feed::controller::{FeedController, FeedFilter, FeedView};
use crate::feed::render::{render_feed, render_status};

#[derive(Clone)]
pub struct AppState {
    controller: Arc<Mutex<FeedController>>,
}

impl AppState {
    pub fn new(controller: FeedController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn controller(&self) -> &Arc<Mutex<FeedController>> {
        &self.controller
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/feed", get(feed_json))
        .route("/feed/html", get(feed_html))
        .route("/feed/refresh", post(feed_refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct FeedQuery {
    #[serde(default)]
    filter: Option<String>,
}

type ApiError = (StatusCode, String);

fn parse_filter(q: &FeedQuery) -> Result<Option<FeedFilter>, ApiError> {
    q.filter
        .as_deref()
        .map(|raw| {
            raw.parse::<FeedFilter>()
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
        })
        .transpose()
}

/// Every page request goes through the cache: a fresh snapshot is served
/// as-is, an expired one is fetched again.
async fn current_view(state: &AppState, filter: Option<FeedFilter>) -> FeedView {
    let mut c = state.controller.lock().await;
    c.load(false).await;
    if let Some(f) = filter {
        c.select_filter(f);
    }
    c.view(Utc::now())
}

async fn feed_json(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Json<FeedView>, ApiError> {
    let filter = parse_filter(&q)?;
    Ok(Json(current_view(&state, filter).await))
}

async fn feed_html(
    State(state): State<AppState>,
    Query(q): Query<FeedQuery>,
) -> Result<Html<String>, ApiError> {
    let filter = parse_filter(&q)?;
    let view = current_view(&state, filter).await;
    let now = Utc::now();
    let status = view.staleness.as_ref().map(render_status).unwrap_or_default();
    Ok(Html(format!(
        r#"<div id="feed-status">{status}</div><div id="feed-container">{}</div>"#,
        render_feed(&view, now)
    )))
}

async fn feed_refresh(State(state): State<AppState>) -> Json<FeedView> {
    let mut c = state.controller.lock().await;
    let next = c.refresh().await;
    tracing::info!(target: "feed", state = next.as_str(), "manual refresh");
    Json(c.view(Utc::now()))
}
