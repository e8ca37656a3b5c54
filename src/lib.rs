// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod feed;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::FeedConfig;
pub use crate::feed::{Aggregator, FeedController, FeedFilter, Item, Source};

use tracing::info;

/// Load config, build the controller and run the first load. Never fails:
/// configuration problems leave the controller in its error state.
///
/// ```ignore
/// let controller = social_feed::bootstrap().await;
/// let app = social_feed::router(social_feed::AppState::new(controller));
/// ```
pub async fn bootstrap() -> FeedController {
    let mut controller = FeedController::init(config::load_config_default());
    let state = controller.load(false).await;
    info!(
        state = state.as_str(),
        items = controller.items().len(),
        "feed bootstrap finished"
    );
    controller
}
