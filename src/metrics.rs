use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Process-wide Prometheus recorder for the feed service. The `feed_*`
/// series are registered by the aggregator on first use; this only adds the
/// configured snapshot lifetime so dashboards can compare it against
/// `feed_last_refresh_ts`.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    pub fn init(cache_ttl_secs: i64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing the feed metrics recorder")?;

        describe_gauge!(
            "feed_cache_ttl_secs",
            "Lifetime of a cached feed snapshot in seconds."
        );
        gauge!("feed_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`, merged into the API router by the binary.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
    }
}
