// src/feed/render.rs
//! HTML fragment rendering. Every string that came from a remote API is
//! escaped; only items flagged `pre_rendered` keep their content verbatim.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

use crate::feed::controller::{FeedView, ViewState, ERROR_MESSAGE};
use crate::feed::staleness::{format_relative, Staleness};
use crate::feed::types::{Engagement, Item, ItemKind, Source};

/// Images shown per item.
pub const MAX_IMAGES: usize = 4;

pub const EMPTY_MESSAGE: &str = "No feed items found.";

fn source_icon(source: Source) -> &'static str {
    match source {
        Source::Bluesky => r#"<span class="icon-butterfly"></span>"#,
        Source::Github => r#"<span class="icon-github-logo"></span>"#,
    }
}

fn kind_icon(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Post => r#"<span class="icon-chat-text"></span>"#,
        ItemKind::Push => r#"<span class="icon-git-commit"></span>"#,
        ItemKind::Create => r#"<span class="icon-plus"></span>"#,
        ItemKind::Pr => r#"<span class="icon-git-pull-request"></span>"#,
        ItemKind::Issue => r#"<span class="icon-warning-circle"></span>"#,
        ItemKind::Release => r#"<span class="icon-tag"></span>"#,
        ItemKind::Star => r#"<span class="icon-star"></span>"#,
        ItemKind::Fork => r#"<span class="icon-git-fork"></span>"#,
        ItemKind::Activity => r#"<span class="icon-activity"></span>"#,
    }
}

fn render_engagement(e: &Engagement) -> String {
    let mut out = String::new();
    for (count, icon) in [
        (e.likes, "icon-heart"),
        (e.reposts, "icon-repeat"),
        (e.replies, "icon-chat-text"),
    ] {
        if count > 0 {
            let _ = write!(
                out,
                r#"<span class="engagement-stat"><span class="{icon}"></span> {count}</span>"#
            );
        }
    }
    if out.is_empty() {
        return out;
    }
    format!(r#"<div class="feed-item__engagement">{out}</div>"#)
}

fn render_images(images: &[String]) -> String {
    if images.is_empty() {
        return String::new();
    }
    let imgs: String = images
        .iter()
        .take(MAX_IMAGES)
        .map(|src| {
            format!(
                r#"<img src="{}" alt="" loading="lazy" />"#,
                encode_double_quoted_attribute(src)
            )
        })
        .collect();
    format!(r#"<div class="feed-item__images">{imgs}</div>"#)
}

/// One `<article>` for an item.
pub fn render_item(item: &Item, now: DateTime<Utc>) -> String {
    let title = item
        .title
        .as_deref()
        .map(|t| format!(r#"<h3 class="feed-item__title">{}</h3>"#, encode_text(t)))
        .unwrap_or_default();
    let content = if item.pre_rendered {
        item.content.clone()
    } else {
        encode_text(&item.content).into_owned()
    };
    let engagement = item
        .engagement
        .as_ref()
        .map(render_engagement)
        .unwrap_or_default();

    format!(
        concat!(
            r#"<article class="feed-item" data-source="{source}" data-type="{kind}">"#,
            r#"<div class="feed-item__header">"#,
            r#"<span class="feed-item__source {source}" title="{source}">{source_icon}</span>"#,
            r#"<span class="feed-item__type" title="{kind}">{kind_icon}</span>"#,
            r#"<time class="feed-item__date" datetime="{datetime}">{relative}</time>"#,
            r#"</div>"#,
            r#"{title}"#,
            r#"<div class="feed-item__content">{content}</div>"#,
            r#"{images}{engagement}"#,
            r#"<a href="{url}" class="feed-item__link" target="_blank" rel="noopener noreferrer">View on {label} →</a>"#,
            r#"</article>"#
        ),
        source = item.source,
        kind = item.kind,
        source_icon = source_icon(item.source),
        kind_icon = kind_icon(item.kind),
        datetime = item.timestamp.to_rfc3339(),
        relative = format_relative(item.timestamp, now),
        title = title,
        content = content,
        images = render_images(&item.images),
        engagement = engagement,
        url = encode_double_quoted_attribute(&item.url),
        label = item.source.label(),
    )
}

/// The feed container body for a view.
pub fn render_feed(view: &FeedView, now: DateTime<Utc>) -> String {
    match view.state {
        ViewState::Error => format!(
            r#"<div class="feed-error">{}</div>"#,
            view.message.unwrap_or(ERROR_MESSAGE)
        ),
        ViewState::Loading => r#"<div class="feed-loading">Loading feeds...</div>"#.to_string(),
        _ if view.items.is_empty() => format!(r#"<div class="feed-empty">{EMPTY_MESSAGE}</div>"#),
        _ => view.items.iter().map(|i| render_item(i, now)).collect(),
    }
}

/// "Last updated" line with the auto-refresh countdown.
pub fn render_status(staleness: &Staleness) -> String {
    format!(
        r#"<span>Last updated: {}<br><small>Auto-refresh in: {}</small></span>"#,
        staleness.last_updated.format("%Y-%m-%d %H:%M UTC"),
        staleness.time_until_refresh()
    )
}
