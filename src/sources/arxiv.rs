//! arXiv research source implementation.

use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{ArxivPaper, SortBy};
use crate::sources::{Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities};
use crate::transport::HttpRequest;

/// Base URL for the arXiv query API
const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Largest page the API serves in one response
pub const MAX_RESULTS: usize = 2000;

/// arXiv research source
///
/// Supports:
/// - Search by free-text query, author or category
/// - Lookup by one or many arXiv IDs
#[derive(Debug, Clone)]
pub struct ArxivClient {
    endpoint: Endpoint,
}

impl ArxivClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let endpoint = options
            .endpoint(ARXIV_API_URL, Duration::from_secs(30))?
            .with_header("Accept", "application/atom+xml");
        Ok(Self { endpoint })
    }

    /// Normalize an arXiv ID from various formats
    ///
    /// Handles formats like:
    /// - "2301.12345"
    /// - "2301.12345v1" (version is kept)
    /// - "arxiv:2301.12345"
    /// - "https://arxiv.org/abs/2301.12345v1"
    pub fn parse_id(id: &str) -> Result<String, ClientError> {
        let id = id.trim();

        let id = match id.to_ascii_lowercase().find("/abs/") {
            Some(pos) => &id[pos + 5..],
            None => id,
        };

        let id = match id.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("arxiv:") => &id[6..],
            _ => id,
        };

        if id.is_empty() {
            return Err(ClientError::Configuration("Empty arXiv ID".to_string()));
        }

        Ok(id.to_string())
    }

    /// Build the query request; the page size is clamped to `[1, MAX_RESULTS]`
    pub fn search_request(&self, query: &str, max_results: usize, sort_by: SortBy) -> HttpRequest {
        let sort = match sort_by {
            SortBy::Relevance => "relevance",
            SortBy::Date => "lastUpdatedDate",
        };

        self.endpoint
            .get("")
            .query("search_query", query)
            .query("start", 0)
            .query("max_results", max_results.clamp(1, MAX_RESULTS))
            .query("sortBy", sort)
            .query("sortOrder", "descending")
    }

    fn id_list_request(&self, ids: &[String]) -> HttpRequest {
        self.endpoint
            .get("")
            .query("id_list", ids.join(","))
            .query("max_results", ids.len().clamp(1, MAX_RESULTS))
    }

    /// Search arXiv for papers matching the query
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<ArxivPaper>, ClientError> {
        let sort_by = sort_by.into();
        tracing::info!(
            "Searching arXiv for: '{}' (max: {}, sort: {})",
            query,
            max_results,
            sort_by
        );

        let request = self.search_request(query, max_results, sort_by);
        let papers = self.fetch(&request).await?;

        tracing::info!("Found {} papers for query: '{}'", papers.len(), query);
        Ok(papers)
    }

    /// Get a paper by its arXiv ID; `None` when arXiv has no such paper
    pub async fn get_by_id(&self, paper_id: &str) -> Result<Option<ArxivPaper>, ClientError> {
        let id = Self::parse_id(paper_id)?;
        tracing::info!("Fetching arXiv paper: {}", id);

        let paper = self
            .fetch(&self.id_list_request(&[id.clone()]))
            .await?
            .into_iter()
            .next();

        match &paper {
            Some(p) => tracing::info!("Retrieved paper: {}", p.title),
            None => tracing::warn!("Paper not found: {}", id),
        }
        Ok(paper)
    }

    /// Get several papers at once; missing IDs are skipped
    pub async fn get_by_ids(&self, paper_ids: &[&str]) -> Result<Vec<ArxivPaper>, ClientError> {
        let ids = paper_ids
            .iter()
            .map(|id| Self::parse_id(id))
            .collect::<Result<Vec<_>, _>>()?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!("Fetching {} arXiv papers", ids.len());
        let papers = self.fetch(&self.id_list_request(&ids)).await?;
        tracing::info!("Retrieved {}/{} papers", papers.len(), ids.len());
        Ok(papers)
    }

    pub async fn search_by_author(
        &self,
        author: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<ArxivPaper>, ClientError> {
        self.search(&format!("au:\"{}\"", author), max_results, sort_by)
            .await
    }

    /// Search within a category such as `cs.AI` or `physics.optics`
    pub async fn search_by_category(
        &self,
        category: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<ArxivPaper>, ClientError> {
        self.search(&format!("cat:{}", category), max_results, sort_by)
            .await
    }

    pub fn format_paper(&self, paper: &ArxivPaper, index: Option<usize>) -> String {
        paper.format(index)
    }

    async fn fetch(&self, request: &HttpRequest) -> Result<Vec<ArxivPaper>, ClientError> {
        let response = self.endpoint.send(request).await?;
        parse_feed(&response.body)
    }
}

#[derive(Debug, Default)]
struct ArxivExtensions {
    doi: Option<String>,
    comment: Option<String>,
    journal_ref: Option<String>,
    primary_category: Option<String>,
}

/// Parse an arXiv Atom feed into papers
pub(crate) fn parse_feed(body: &str) -> Result<Vec<ArxivPaper>, ClientError> {
    let feed = parser::parse(body.as_bytes())
        .map_err(|e| ClientError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

    let mut extensions = scan_extensions(body)?;

    feed.entries
        .iter()
        .filter(|entry| !entry.id.contains("/api/errors"))
        .map(|entry| {
            let ext = extensions.remove(&entry.id).unwrap_or_default();
            parse_entry(entry, ext)
        })
        .collect::<Result<Vec<_>, _>>()
        .and_then(|papers| {
            // arXiv reports bad queries as a single "Error" entry
            match feed.entries.iter().find(|e| e.id.contains("/api/errors")) {
                Some(error) if papers.is_empty() => Err(ClientError::Parse(format!(
                    "arXiv API error: {}",
                    error
                        .summary
                        .as_ref()
                        .map(|s| s.content.trim().to_string())
                        .unwrap_or_default()
                ))),
                _ => Ok(papers),
            }
        })
}

/// Collect the `arxiv:` namespace elements feed-rs does not expose, keyed by entry id
fn scan_extensions(body: &str) -> Result<HashMap<String, ArxivExtensions>, ClientError> {
    let xml_err = |e: quick_xml::Error| ClientError::Parse(format!("XML: {}", e));

    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut found = HashMap::new();
    let mut in_entry = false;
    let mut current_id = String::new();
    let mut current = ArxivExtensions::default();
    let mut element: Vec<u8> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"entry" {
                    in_entry = true;
                    current_id.clear();
                    current = ArxivExtensions::default();
                }
                element = name;
            }
            Event::Empty(e) if in_entry && e.local_name().as_ref() == b"primary_category" => {
                if let Ok(Some(term)) = e.try_get_attribute("term") {
                    let value = term.unescape_value().map_err(xml_err)?;
                    current.primary_category = Some(value.into_owned());
                }
            }
            Event::Text(t) if in_entry => {
                let text = t.unescape().map_err(xml_err)?.trim().to_string();
                match element.as_slice() {
                    b"id" => current_id = text,
                    b"doi" => current.doi = Some(text),
                    b"comment" => current.comment = Some(text),
                    b"journal_ref" => current.journal_ref = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"entry" {
                    in_entry = false;
                    found.insert(
                        std::mem::take(&mut current_id),
                        std::mem::take(&mut current),
                    );
                }
                element.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_entry(entry: &feed_rs::model::Entry, ext: ArxivExtensions) -> Result<ArxivPaper, ClientError> {
    let entry_id = entry.id.clone();

    let arxiv_id = entry_id
        .split("/abs/")
        .nth(1)
        .or_else(|| entry_id.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ClientError::Parse(format!("Missing paper ID in '{}'", entry_id)))?
        .to_string();

    let title = entry
        .title
        .as_ref()
        .map(|t| collapse_whitespace(&t.content))
        .unwrap_or_default();

    let published = entry
        .published
        .or(entry.updated)
        .ok_or_else(|| ClientError::Parse(format!("Entry {} has no published date", arxiv_id)))?;
    let updated = entry.updated.unwrap_or(published);

    let pdf_url = entry
        .links
        .iter()
        .find(|l| {
            l.title.as_deref() == Some("pdf") || l.media_type.as_deref() == Some("application/pdf")
        })
        .map(|l| l.href.clone())
        .unwrap_or_else(|| entry_id.replace("/abs/", "/pdf/"));

    Ok(ArxivPaper {
        title,
        authors: entry.authors.iter().map(|a| a.name.clone()).collect(),
        summary: entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .unwrap_or_default(),
        published,
        updated,
        arxiv_id,
        pdf_url,
        categories: entry.categories.iter().map(|c| c.term.clone()).collect(),
        entry_id,
        doi: ext.doi,
        comment: ext.comment,
        journal_ref: ext.journal_ref,
        primary_category: ext.primary_category,
    })
}

impl Adapter for ArxivClient {
    fn id(&self) -> &'static str {
        "arxiv"
    }

    fn name(&self) -> &'static str {
        "arXiv"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Raise
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}
