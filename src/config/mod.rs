pub mod feed;

pub use feed::{
    load_config_default, load_config_from, BlueskyConfig, CacheConfig, FeedConfig, GithubConfig,
    HttpConfig, UnknownEventPolicy, ENV_FEED_CONFIG_PATH,
};
