// tests/providers_bluesky.rs
use social_feed::feed::providers::bluesky::BlueskyProvider;
use social_feed::feed::{ItemKind, Source, SourceAdapter};

const FIXTURE: &str = include_str!("fixtures/bluesky_author_feed.json");

#[tokio::test]
async fn fixture_maps_every_post() {
    let p = BlueskyProvider::from_fixture_str("alice.bsky.social", FIXTURE);
    assert_eq!(p.source(), Source::Bluesky);
    assert_eq!(p.name(), "bluesky");

    let items = p.fetch().await.expect("fixture parses");
    assert_eq!(items.len(), 5);
    assert!(items
        .iter()
        .all(|i| i.source == Source::Bluesky && i.kind == ItemKind::Post));
    assert!(items.iter().all(|i| i.title.is_none()));

    let first = &items[0];
    assert_eq!(first.id, "at://did:plc:alice123/app.bsky.feed.post/3ktaaa5");
    assert_eq!(
        first.url,
        "https://bsky.app/profile/alice.bsky.social/post/3ktaaa5"
    );
    assert_eq!(first.author, "Alice");
    assert!(first.avatar_url.is_some());
    let e = first.engagement.expect("bluesky items carry engagement");
    assert_eq!((e.likes, e.reposts, e.replies), (12, 3, 0));
}

#[tokio::test]
async fn empty_text_gets_placeholder_and_handle_is_author_fallback() {
    let items = BlueskyProvider::from_fixture_str("alice.bsky.social", FIXTURE)
        .fetch()
        .await
        .unwrap();
    let blank = items
        .iter()
        .find(|i| i.id.ends_with("3ktaaa3"))
        .expect("blank post present");
    assert_eq!(blank.content, "No content");
    assert_eq!(blank.author, "alice.bsky.social");
    assert_eq!(blank.engagement.map(|e| e.likes), Some(0));
}

#[tokio::test]
async fn image_thumbnails_are_collected() {
    let items = BlueskyProvider::from_fixture_str("alice.bsky.social", FIXTURE)
        .fetch()
        .await
        .unwrap();
    let photos = items.iter().find(|i| i.id.ends_with("3ktaaa4")).unwrap();
    assert_eq!(
        photos.images,
        vec![
            "https://cdn.bsky.app/img/feed_thumbnail/1".to_string(),
            "https://cdn.bsky.app/img/feed_thumbnail/2".to_string(),
        ]
    );
}

#[tokio::test]
async fn undecodable_body_is_a_non_fatal_error() {
    let err = BlueskyProvider::from_fixture_str("alice.bsky.social", "<html>")
        .fetch()
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
}

#[test]
fn missing_feed_array_means_no_posts() {
    let items = BlueskyProvider::parse_author_feed("alice.bsky.social", "{}").unwrap();
    assert!(items.is_empty());
}
