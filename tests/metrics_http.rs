// tests/metrics_http.rs
//
// Own test binary: installs the global Prometheus recorder.

use metrics_exporter_prometheus::PrometheusBuilder;
use social_feed::config::FeedConfig;
use social_feed::feed::Aggregator;

#[tokio::test]
async fn transport_failures_are_counted_for_every_request() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("recorder");

    // a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let mut cfg = FeedConfig::default();
    cfg.bluesky.handle = "alice.bsky.social".into();
    cfg.bluesky.api_base = format!("http://{addr}");
    cfg.github.username = "alice".into();
    cfg.github.api_base = format!("http://{addr}");
    cfg.cache.dir = dir.path().to_path_buf();

    let items = Aggregator::from_config(&cfg)
        .unwrap()
        .load(false)
        .await
        .unwrap();
    assert!(items.is_empty());

    // the Bluesky failure happens on the handle lookup, before the feed request
    let out = handle.render();
    assert!(out.contains(r#"feed_http_errors_total{source="bluesky"} 1"#), "{out}");
    assert!(out.contains(r#"feed_http_errors_total{source="github"} 1"#), "{out}");
    assert!(out.contains(r#"feed_adapter_errors_total{source="bluesky"} 1"#), "{out}");
}
