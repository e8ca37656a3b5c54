//! Social Feed Service: binary entrypoint.
//! Boots the Axum HTTP server: loads feed config, runs the first
//! aggregation, and serves the timeline plus Prometheus metrics.

use shuttle_axum::ShuttleAxum;
use social_feed::feed::CACHE_TTL;
use social_feed::metrics::Metrics;
use social_feed::{api, AppState};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEV_LOG_ENV: &str = "FEED_DEV_LOG";

/// Local runs: any debug build, or a Shuttle environment named local/dev.
fn running_locally() -> bool {
    if cfg!(debug_assertions) {
        return true;
    }
    let env = std::env::var("SHUTTLE_ENV")
        .unwrap_or_default()
        .to_ascii_lowercase();
    matches!(env.as_str(), "local" | "development" | "dev")
}

/// Compact feed logs (`feed` and `feed::cache` targets at debug) when
/// `FEED_DEV_LOG=1` is set on a local run. Leaves an already installed
/// subscriber in place.
fn enable_dev_tracing() {
    let requested = std::env::var(DEV_LOG_ENV).is_ok_and(|v| v == "1");
    if !(requested && running_locally()) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed=debug,info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // FEED_CONFIG_PATH / FEED_DEV_LOG may come from a local .env
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let metrics = Metrics::init(CACHE_TTL.num_seconds())?;
    let controller = social_feed::bootstrap().await;

    let router = api::router(AppState::new(controller)).merge(metrics.router());

    Ok(router.into())
}
