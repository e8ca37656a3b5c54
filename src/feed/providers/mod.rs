// src/feed/providers/mod.rs
pub mod bluesky;
pub mod github;

use metrics::counter;
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::feed::types::{AdapterError, Source};

/// `base` with `segments` appended as encoded path segments, plus query
/// params. A failure here is a configuration problem, not a network one.
pub(crate) fn build_url(
    base: &str,
    segments: &[&str],
    params: &[(&str, &str)],
) -> Result<Url, AdapterError> {
    let invalid = |e: String| AdapterError::InvalidRequest(format!("{base}: {e}"));
    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("not usable as an api base".to_string()))?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Identifiers (handles, usernames) end up in URL paths or query strings.
/// Only the characters real handles/logins use are accepted, and a value
/// made of dots alone is refused so it can never act as a relative segment.
pub(crate) fn validate_identifier(kind: &str, value: &str) -> Result<(), AdapterError> {
    if value.is_empty() {
        return Err(AdapterError::InvalidRequest(format!("{kind} is empty")));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':');
    if !value.chars().all(allowed) || value.chars().all(|c| c == '.') {
        return Err(AdapterError::InvalidRequest(format!(
            "{kind} `{value}` is not a valid identifier"
        )));
    }
    Ok(())
}

/// GET `url` and return the body. Transport failures are counted per
/// source; any non-2xx status is a fetch failure.
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    url: Url,
    source: Source,
    accept: &str,
) -> Result<String, AdapterError> {
    let resp = match client
        .get(url.clone())
        .header(reqwest::header::ACCEPT, accept)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            counter!("feed_http_errors_total", "source" => source.as_str()).increment(1);
            return Err(e.into());
        }
    };
    let status = resp.status();
    if !status.is_success() {
        return Err(AdapterError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text().await?)
}

/// [`fetch_text`] + JSON decode.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    source: Source,
) -> Result<T, AdapterError> {
    let body = fetch_text(client, url, source, "application/json").await?;
    Ok(serde_json::from_str(&body)?)
}
