//! One-shot run: load config, aggregate once, print the timeline.
//!
//! Usage: `feed_demo [all|bluesky|github] [--refresh]`

use chrono::{DateTime, Utc};
use social_feed::feed::render::EMPTY_MESSAGE;
use social_feed::feed::staleness::format_relative;
use social_feed::{FeedController, FeedFilter, Item};

fn line(item: &Item, now: DateTime<Utc>) -> String {
    let head = item.title.as_deref().unwrap_or(&item.content);
    format!(
        "[{:<7}] {:<8} {:>10}  {}\n           {}",
        item.source.as_str(),
        item.kind.as_str(),
        format_relative(item.timestamp, now),
        head.lines().next().unwrap_or_default(),
        item.url
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut filter = FeedFilter::All;
    let mut refresh = false;
    for arg in std::env::args().skip(1) {
        if arg == "--refresh" {
            refresh = true;
        } else {
            filter = arg.parse()?;
        }
    }

    let mut controller = FeedController::init(social_feed::config::load_config_default());
    if refresh {
        controller.refresh().await;
    } else {
        controller.load(false).await;
    }
    controller.select_filter(filter);

    let now = Utc::now();
    let view = controller.view(now);
    if let Some(msg) = view.message {
        anyhow::bail!(msg);
    }
    if view.is_empty() {
        println!("{EMPTY_MESSAGE}");
    }
    for item in &view.items {
        println!("{}", line(item, now));
    }
    if let Some(s) = view.staleness {
        println!(
            "-- {} of {} items, next refresh in {}",
            view.items.len(),
            view.total,
            s.time_until_refresh()
        );
    }
    Ok(())
}
