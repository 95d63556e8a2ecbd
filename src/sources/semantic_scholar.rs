//! Semantic Scholar research source implementation.

use serde::Deserialize;
use std::time::Duration;

use crate::models::ScholarPaper;
use crate::sources::{Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities};
use crate::transport::HttpRequest;

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Largest page the search endpoint accepts
pub const MAX_LIMIT: usize = 100;

/// Fields requested when the caller does not choose any
pub const DEFAULT_FIELDS: &[&str] = &[
    "title",
    "authors",
    "year",
    "abstract",
    "externalIds",
    "venue",
    "url",
    "paperId",
    "citationCount",
    "referenceCount",
    "influentialCitationCount",
];

/// Semantic Scholar research source
///
/// Uses the Semantic Scholar graph REST API. An API key is optional and only
/// raises the rate limit.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
    endpoint: Endpoint,
}

impl SemanticScholarClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let mut endpoint = options
            .endpoint(SEMANTIC_API_BASE, Duration::from_secs(30))?
            .with_header("Accept", "application/json");

        if let Some(key) = options.key() {
            endpoint = endpoint.with_header("x-api-key", key);
        }

        Ok(Self { endpoint })
    }

    /// The search request shared by the async and blocking entry points
    pub fn search_request(&self, query: &str, limit: usize, fields: Option<&[&str]>) -> HttpRequest {
        self.endpoint
            .get("/paper/search")
            .query("query", query)
            .query("limit", limit.clamp(1, MAX_LIMIT))
            .query("fields", fields.unwrap_or(DEFAULT_FIELDS).join(","))
    }

    /// Search for papers
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<ScholarPaper>, ClientError> {
        tracing::info!("Searching Semantic Scholar: '{}' (limit={})", query, limit);

        let request = self.search_request(query, limit, fields);
        let response = self.endpoint.send(&request).await?;
        let papers = normalize_search(&response.body)?;

        tracing::info!("Found {} papers", papers.len());
        Ok(papers)
    }

    /// Blocking twin of [`search`](Self::search).
    ///
    /// Must not be called from inside an async runtime.
    pub fn search_blocking(
        &self,
        query: &str,
        limit: usize,
        fields: Option<&[&str]>,
    ) -> Result<Vec<ScholarPaper>, ClientError> {
        tracing::info!(
            "Searching Semantic Scholar (blocking): '{}' (limit={})",
            query,
            limit
        );

        let request = self.search_request(query, limit, fields);
        let response = self.endpoint.send_blocking(&request)?;
        let papers = normalize_search(&response.body)?;

        tracing::info!("Found {} papers", papers.len());
        Ok(papers)
    }

    /// Get a paper by DOI or any other identifier the API understands.
    ///
    /// Bare DOIs (`10.xxxx/...`) get the `DOI:` prefix. Returns `None` on 404.
    pub async fn get_by_doi(
        &self,
        doi: &str,
        fields: Option<&[&str]>,
    ) -> Result<Option<ScholarPaper>, ClientError> {
        let doi = doi.trim();
        let id = if doi.starts_with("10.") {
            format!("DOI:{}", doi)
        } else {
            doi.to_string()
        };

        tracing::info!("Fetching paper by DOI: {}", id);

        let request = self
            .endpoint
            .get(&format!("/paper/{}", id))
            .query("fields", fields.unwrap_or(DEFAULT_FIELDS).join(","));

        let response = self.endpoint.send_raw(&request).await?;
        if response.status == 404 {
            tracing::info!("Paper not found: {}", id);
            return Ok(None);
        }

        let data: S2Paper = response.error_for_status()?.json()?;
        let paper = to_paper(data);
        if let Some(paper) = &paper {
            tracing::info!("Retrieved paper: {}", paper.title);
        }
        Ok(paper)
    }

    /// Get a paper by arXiv ID (e.g. `2301.07041` or `arXiv:2301.07041`)
    pub async fn get_by_arxiv_id(
        &self,
        arxiv_id: &str,
        fields: Option<&[&str]>,
    ) -> Result<Option<ScholarPaper>, ClientError> {
        let id = arxiv_id.trim();
        let clean = match id.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("arxiv:") => &id[6..],
            _ => id,
        };
        self.get_by_doi(&format!("arXiv:{}", clean.trim()), fields).await
    }
}

impl Adapter for SemanticScholarClient {
    fn id(&self) -> &'static str {
        "semantic_scholar"
    }

    fn name(&self) -> &'static str {
        "Semantic Scholar"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Raise
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP | SourceCapabilities::BLOCKING
    }
}

/// Normalize a search response; entries without a title are dropped
fn normalize_search(body: &str) -> Result<Vec<ScholarPaper>, ClientError> {
    let data: S2SearchResponse = serde_json::from_str(body)?;
    Ok(data.data.into_iter().filter_map(to_paper).collect())
}

fn to_paper(data: S2Paper) -> Option<ScholarPaper> {
    let title = data.title.filter(|t| !t.trim().is_empty())?;

    let doi = data
        .external_ids
        .and_then(|ids| ids.doi)
        .or(data.doi);

    Some(ScholarPaper {
        title,
        authors: data.authors.into_iter().filter_map(|a| a.name).collect(),
        year: data.year,
        abstract_text: data.r#abstract,
        doi,
        keywords: data.topics.into_iter().filter_map(|t| t.topic).collect(),
        venue: data.venue.filter(|v| !v.is_empty()),
        url: data.url,
        paper_id: data.paper_id,
        citation_count: data.citation_count,
        reference_count: data.reference_count,
        influential_citation_count: data.influential_citation_count,
    })
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    paper_id: Option<String>,
    title: Option<String>,
    r#abstract: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    url: Option<String>,
    doi: Option<String>,
    external_ids: Option<S2ExternalIds>,
    #[serde(default)]
    authors: Vec<S2Author>,
    #[serde(default)]
    topics: Vec<S2Topic>,
    citation_count: Option<u64>,
    reference_count: Option<u64>,
    influential_citation_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2Topic {
    topic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}
