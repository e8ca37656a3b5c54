// src/feed/providers/github.rs
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;
use serde_json::Value;

use super::{build_url, fetch_text, validate_identifier};
use crate::config::{GithubConfig, UnknownEventPolicy};
use crate::feed::normalize::{content_or, first_line, long_form_or, non_empty, parse_timestamp};
use crate::feed::types::{AdapterError, Item, ItemKind, Source, SourceAdapter};

/// GitHub event kinds the feed knows how to present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push,
    Create,
    PullRequest,
    Issues,
    Release,
    Watch,
    Fork,
    Other(String),
}

impl EventKind {
    pub fn from_api(name: &str) -> Self {
        match name {
            "PushEvent" => EventKind::Push,
            "CreateEvent" => EventKind::Create,
            "PullRequestEvent" => EventKind::PullRequest,
            "IssuesEvent" => EventKind::Issues,
            "ReleaseEvent" => EventKind::Release,
            "WatchEvent" => EventKind::Watch,
            "ForkEvent" => EventKind::Fork,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    actor: Actor,
    repo: Repo,
    #[serde(default)]
    payload: Value,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
    display_login: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(default)]
    commits: Vec<Commit>,
    size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatePayload {
    ref_type: String,
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    description: Option<String>,
}

/// Shared shape of pull requests and issues.
#[derive(Debug, Deserialize)]
struct Titled {
    title: String,
    body: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: Titled,
}

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    action: String,
    issue: Titled,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    release: Release,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    body: Option<String>,
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForkPayload {
    forkee: Forkee,
}

#[derive(Debug, Deserialize)]
struct Forkee {
    full_name: String,
    html_url: Option<String>,
}

/// Presentation of one event: the per-kind rule output.
struct Rendered {
    kind: ItemKind,
    title: String,
    content: String,
    url: String,
}

/// Public events of one GitHub user.
pub struct GithubProvider {
    username: String,
    policy: UnknownEventPolicy,
    mode: Mode,
}

enum Mode {
    /// Events JSON array, parsed as if it came from the REST API.
    Fixture(String),
    Http {
        client: reqwest::Client,
        api_base: String,
        per_page: u32,
    },
}

impl GithubProvider {
    pub fn from_config(cfg: &GithubConfig, client: reqwest::Client) -> Self {
        Self {
            username: cfg.username.clone(),
            policy: cfg.unknown_events,
            mode: Mode::Http {
                client,
                api_base: cfg.api_base.clone(),
                per_page: cfg.per_page,
            },
        }
    }

    pub fn from_fixture_str(username: &str, events_json: &str) -> Self {
        Self {
            username: username.to_string(),
            policy: UnknownEventPolicy::Drop,
            mode: Mode::Fixture(events_json.to_string()),
        }
    }

    pub fn with_policy(mut self, policy: UnknownEventPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Map a `/users/{name}/events/public` body to items.
    pub fn parse_events(body: &str, policy: UnknownEventPolicy) -> Result<Vec<Item>, AdapterError> {
        let t0 = std::time::Instant::now();
        let events: Vec<RawEvent> = serde_json::from_str(body)?;

        let mut out = Vec::with_capacity(events.len());
        for ev in events {
            let kind = EventKind::from_api(&ev.kind);
            if !kind.is_known() && policy == UnknownEventPolicy::Drop {
                continue;
            }
            let id = ev.id.clone();
            match map_event(ev, &kind) {
                Ok(Some(item)) => out.push(item),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "feed", event_id = %id, kind = ?kind, error = %e, "dropping malformed github event");
                }
            }
        }

        histogram!("feed_parse_ms", "source" => "github")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

fn repo_url(repo: &str) -> String {
    format!("https://github.com/{repo}")
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// The rule table: every kind has exactly one presentation.
fn render_event(kind: &EventKind, repo: &str, payload: Value) -> Result<Rendered, serde_json::Error> {
    let rendered = match kind {
        EventKind::Push => {
            let p: PushPayload = serde_json::from_value(payload)?;
            let count = if p.commits.is_empty() {
                p.size.unwrap_or(0)
            } else {
                p.commits.len()
            };
            let messages = p
                .commits
                .iter()
                .take(3)
                .map(|c| first_line(&c.message))
                .filter(|m| !m.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Rendered {
                kind: ItemKind::Push,
                title: format!("Pushed {count} commit{} to {repo}", plural(count)),
                content: content_or(Some(messages.as_str()), "No commit message"),
                url: format!("{}/commits", repo_url(repo)),
            }
        }
        EventKind::Create => {
            let p: CreatePayload = serde_json::from_value(payload)?;
            let title = match non_empty(p.git_ref.as_deref()) {
                Some(r) => format!("Created {} {r} in {repo}", p.ref_type),
                None => format!("Created {} in {repo}", p.ref_type),
            };
            Rendered {
                kind: ItemKind::Create,
                title,
                content: long_form_or(
                    p.description.as_deref(),
                    &format!("New {} created", p.ref_type),
                ),
                url: repo_url(repo),
            }
        }
        EventKind::PullRequest => {
            let p: PullRequestPayload = serde_json::from_value(payload)?;
            Rendered {
                kind: ItemKind::Pr,
                title: format!("{} PR: {}", p.action, p.pull_request.title),
                content: long_form_or(p.pull_request.body.as_deref(), "No description"),
                url: link_or_repo(p.pull_request.html_url, repo),
            }
        }
        EventKind::Issues => {
            let p: IssuesPayload = serde_json::from_value(payload)?;
            Rendered {
                kind: ItemKind::Issue,
                title: format!("{} issue: {}", p.action, p.issue.title),
                content: long_form_or(p.issue.body.as_deref(), "No description"),
                url: link_or_repo(p.issue.html_url, repo),
            }
        }
        EventKind::Release => {
            let p: ReleasePayload = serde_json::from_value(payload)?;
            Rendered {
                kind: ItemKind::Release,
                title: format!("Released {} of {repo}", p.release.tag_name),
                content: long_form_or(p.release.body.as_deref(), "New release"),
                url: link_or_repo(p.release.html_url, repo),
            }
        }
        EventKind::Watch => Rendered {
            kind: ItemKind::Star,
            title: format!("Starred {repo}"),
            content: "Added repository to starred list".to_string(),
            url: repo_url(repo),
        },
        EventKind::Fork => {
            let p: ForkPayload = serde_json::from_value(payload)?;
            Rendered {
                kind: ItemKind::Fork,
                title: format!("Forked {repo}"),
                content: format!("Created fork at {}", p.forkee.full_name),
                url: link_or_repo(p.forkee.html_url, repo),
            }
        }
        EventKind::Other(name) => Rendered {
            kind: ItemKind::Activity,
            title: format!("Activity on {repo}"),
            content: name.clone(),
            url: repo_url(repo),
        },
    };
    Ok(rendered)
}

fn link_or_repo(link: Option<String>, repo: &str) -> String {
    link.filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| repo_url(repo))
}

fn map_event(ev: RawEvent, kind: &EventKind) -> Result<Option<Item>, serde_json::Error> {
    let Some(timestamp) = parse_timestamp(&ev.created_at) else {
        tracing::debug!(target: "feed", event_id = %ev.id, "skipping event with invalid created_at");
        return Ok(None);
    };
    let rendered = render_event(kind, &ev.repo.name, ev.payload)?;
    let author = non_empty(ev.actor.display_login.as_deref())
        .unwrap_or(&ev.actor.login)
        .to_string();

    Ok(Some(Item {
        id: ev.id,
        source: Source::Github,
        kind: rendered.kind,
        title: Some(rendered.title),
        content: rendered.content,
        url: rendered.url,
        timestamp,
        author,
        avatar_url: ev.actor.avatar_url,
        engagement: None,
        images: Vec::new(),
        repo: Some(ev.repo.name),
        pre_rendered: false,
    }))
}

#[async_trait]
impl SourceAdapter for GithubProvider {
    async fn fetch(&self) -> Result<Vec<Item>, AdapterError> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_events(body, self.policy),
            Mode::Http {
                client,
                api_base,
                per_page,
            } => {
                validate_identifier("github username", &self.username)?;
                let per_page = per_page.to_string();
                let url = build_url(
                    api_base,
                    &["users", self.username.as_str(), "events", "public"],
                    &[("per_page", per_page.as_str())],
                )?;
                let body =
                    fetch_text(client, url, Source::Github, "application/vnd.github+json").await?;
                Self::parse_events(&body, self.policy)
            }
        }
    }

    fn source(&self) -> Source {
        Source::Github
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, payload: &str) -> String {
        format!(
            r#"[{{"id":"1","type":"{kind}","actor":{{"login":"octo","avatar_url":"https://a/x"}},
               "repo":{{"name":"octo/repo"}},"payload":{payload},"created_at":"2024-05-01T10:00:00Z"}}]"#
        )
    }

    #[test]
    fn push_title_pluralizes_and_lists_first_lines() {
        let body = event(
            "PushEvent",
            r#"{"commits":[{"message":"one\n\nbody"},{"message":"two"}]}"#,
        );
        let items = GithubProvider::parse_events(&body, UnknownEventPolicy::Drop).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Pushed 2 commits to octo/repo"));
        assert_eq!(items[0].content, "one, two");
        assert_eq!(items[0].url, "https://github.com/octo/repo/commits");
        assert_eq!(items[0].author, "octo");

        let single = event("PushEvent", r#"{"commits":[]}"#);
        let items = GithubProvider::parse_events(&single, UnknownEventPolicy::Drop).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Pushed 0 commits to octo/repo"));
        assert_eq!(items[0].content, "No commit message");
    }

    #[test]
    fn create_without_ref_has_no_double_space() {
        let body = event("CreateEvent", r#"{"ref_type":"repository","ref":null}"#);
        let items = GithubProvider::parse_events(&body, UnknownEventPolicy::Drop).unwrap();
        assert_eq!(items[0].title.as_deref(), Some("Created repository in octo/repo"));
        assert_eq!(items[0].content, "New repository created");
    }

    #[test]
    fn unknown_kinds_follow_policy() {
        let body = event("GollumEvent", "{}");
        let dropped = GithubProvider::parse_events(&body, UnknownEventPolicy::Drop).unwrap();
        assert!(dropped.is_empty());

        let generic = GithubProvider::parse_events(&body, UnknownEventPolicy::Generic).unwrap();
        assert_eq!(generic[0].kind, ItemKind::Activity);
        assert_eq!(generic[0].content, "GollumEvent");
        assert_eq!(generic[0].url, "https://github.com/octo/repo");
    }

    #[test]
    fn malformed_payload_drops_only_that_event() {
        let body = event("PullRequestEvent", r#"{"action":"opened"}"#);
        let items = GithubProvider::parse_events(&body, UnknownEventPolicy::Drop).unwrap();
        assert!(items.is_empty());
    }
}
