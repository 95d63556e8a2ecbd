//! GitHub REST API source.

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities,
};
use crate::utils::{into_record, map_array, pick};

const GITHUB_API_BASE: &str = "https://api.github.com";

/// Largest page the search endpoints serve
pub const MAX_PER_PAGE: usize = 100;

/// Sort direction for search endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchOrder {
    Asc,
    #[default]
    Desc,
}

impl SearchOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Asc => "asc",
            SearchOrder::Desc => "desc",
        }
    }
}

/// GitHub client
///
/// A token is optional; without one GitHub allows 60 requests an hour.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    endpoint: Endpoint,
}

impl GitHubClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let mut endpoint = options
            .endpoint(GITHUB_API_BASE, Duration::from_secs(30))?
            .with_header("Accept", "application/vnd.github.v3+json");

        match options.key() {
            Some(token) => endpoint = endpoint.with_header("Authorization", format!("Bearer {}", token)),
            None => tracing::warn!("No GitHub token provided; rate limits will be restrictive"),
        }

        Ok(Self { endpoint })
    }

    /// Search repositories, e.g. `language:rust stars:>1000`.
    ///
    /// `sort` is one of `stars`, `forks` or `updated`.
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: SearchOrder,
        per_page: usize,
    ) -> Result<Record, ClientError> {
        tracing::info!("Searching GitHub repositories: {}", query);

        let request = self
            .endpoint
            .get("/search/repositories")
            .query("q", query)
            .query("sort", sort)
            .query("order", order.as_str())
            .query("per_page", per_page.clamp(1, MAX_PER_PAGE));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "query": query,
                "total_count": data.get("total_count").cloned().unwrap_or(json!(0)),
                "repositories": map_array(&data, "/items", repository_summary),
            }))
        });

        sentinel("github", "search_repositories", outcome)
    }

    /// Search code, e.g. `addClass in:file language:js`
    pub async fn search_code(&self, query: &str, per_page: usize) -> Result<Record, ClientError> {
        tracing::info!("Searching GitHub code: {}", query);

        let request = self
            .endpoint
            .get("/search/code")
            .query("q", query)
            .query("per_page", per_page.clamp(1, MAX_PER_PAGE));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "query": query,
                "total_count": data.get("total_count").cloned().unwrap_or(json!(0)),
                "results": map_array(&data, "/items", |item| json!({
                    "name": pick(item, "/name"),
                    "path": pick(item, "/path"),
                    "repository": pick(item, "/repository/full_name"),
                    "url": pick(item, "/html_url"),
                    "language": pick(item, "/language"),
                })),
            }))
        });

        sentinel("github", "search_code", outcome)
    }

    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Record, ClientError> {
        if owner.trim().is_empty() || repo.trim().is_empty() {
            return Err(ClientError::Configuration(
                "Repository owner and name are required".to_string(),
            ));
        }

        tracing::info!("Fetching GitHub repository {}/{}", owner, repo);
        let request = self.endpoint.get(&format!("/repos/{}/{}", owner, repo));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "name": pick(&data, "/full_name"),
                "description": pick(&data, "/description"),
                "stars": pick(&data, "/stargazers_count"),
                "forks": pick(&data, "/forks_count"),
                "watchers": pick(&data, "/watchers_count"),
                "language": pick(&data, "/language"),
                "topics": data.get("topics").cloned().unwrap_or(json!([])),
                "created_at": pick(&data, "/created_at"),
                "updated_at": pick(&data, "/updated_at"),
                "url": pick(&data, "/html_url"),
                "homepage": pick(&data, "/homepage"),
                "license": pick(&data, "/license/name"),
            }))
        });

        sentinel("github", "get_repository", outcome)
    }

    /// Search issues and pull requests.
    ///
    /// `sort` is one of `created`, `updated` or `comments`.
    pub async fn search_issues(
        &self,
        query: &str,
        sort: &str,
        order: SearchOrder,
        per_page: usize,
    ) -> Result<Record, ClientError> {
        tracing::info!("Searching GitHub issues: {}", query);

        let request = self
            .endpoint
            .get("/search/issues")
            .query("q", query)
            .query("sort", sort)
            .query("order", order.as_str())
            .query("per_page", per_page.clamp(1, MAX_PER_PAGE));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "query": query,
                "total_count": data.get("total_count").cloned().unwrap_or(json!(0)),
                "issues": map_array(&data, "/items", issue_summary),
            }))
        });

        sentinel("github", "search_issues", outcome)
    }
}

fn repository_summary(item: &Value) -> Value {
    json!({
        "name": pick(item, "/full_name"),
        "description": pick(item, "/description"),
        "stars": pick(item, "/stargazers_count"),
        "forks": pick(item, "/forks_count"),
        "language": pick(item, "/language"),
        "url": pick(item, "/html_url"),
        "topics": item.get("topics").cloned().unwrap_or(json!([])),
    })
}

fn issue_summary(item: &Value) -> Value {
    // repository_url ends in /repos/{owner}/{repo}
    let repository = item
        .get("repository_url")
        .and_then(Value::as_str)
        .and_then(|url| {
            let mut parts = url.rsplit('/');
            let repo = parts.next()?;
            let owner = parts.next()?;
            Some(format!("{}/{}", owner, repo))
        });

    json!({
        "title": pick(item, "/title"),
        "number": pick(item, "/number"),
        "state": pick(item, "/state"),
        "user": pick(item, "/user/login"),
        "repository": repository,
        "created_at": pick(item, "/created_at"),
        "url": pick(item, "/html_url"),
        "labels": map_array(item, "/labels", |label| pick(label, "/name")),
    })
}

impl Adapter for GitHubClient {
    fn id(&self) -> &'static str {
        "github"
    }

    fn name(&self) -> &'static str {
        "GitHub"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}
