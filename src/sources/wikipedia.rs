//! Wikipedia (MediaWiki action API) source.

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::utils::{into_record, pick, pick_str};

const DEFAULT_LANGUAGE: &str = "en";
const USER_AGENT: &str = "research-clients-wikipedia/1.0";

/// Wikipedia client bound to one language edition
#[derive(Debug, Clone)]
pub struct WikipediaClient {
    endpoint: Endpoint,
    language: String,
}

impl WikipediaClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let language = options
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let base = format!("https://{}.wikipedia.org/w/api.php", language);
        let endpoint = options
            .endpoint(&base, Duration::from_secs(30))?
            .with_header("User-Agent", USER_AGENT);

        Ok(Self { endpoint, language })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Public article URL for a title
    pub fn article_url(&self, title: &str) -> String {
        format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            title.replace(' ', "_")
        )
    }

    /// Title search through the opensearch API
    pub async fn search(&self, query: &str, limit: usize) -> Result<Record, ClientError> {
        tracing::info!("Searching Wikipedia ({}): {}", self.language, query);

        let request = self
            .endpoint
            .get("")
            .query("action", "opensearch")
            .query("search", query)
            .query("limit", limit)
            .query("format", "json");

        let outcome = self
            .endpoint
            .fetch_json(&request)
            .await
            .and_then(|data| {
                let results = opensearch_results(&data);
                into_record(json!({
                    "query": query,
                    "count": results.len(),
                    "results": results,
                }))
            });

        sentinel("wikipedia", "search", outcome)
    }

    /// Introductory extract plus lead image
    pub async fn get_summary(&self, title: &str) -> Result<Record, ClientError> {
        tracing::info!("Fetching Wikipedia summary: {}", title);

        let request = self
            .endpoint
            .get("")
            .query("action", "query")
            .query("prop", "extracts|pageimages")
            .query("exintro", 1)
            .query("explaintext", 1)
            .query("titles", title)
            .query("format", "json")
            .query("piprop", "original");

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let Some(page) = first_page(&data) else {
                return Ok(error_record("Article not found"));
            };
            into_record(json!({
                "title": pick(page, "/title"),
                "summary": pick(page, "/extract"),
                "page_id": pick(page, "/pageid"),
                "image": pick(page, "/original/source"),
                "url": self.article_url(title),
            }))
        });

        sentinel("wikipedia", "get_summary", outcome)
    }

    /// Whole article as plain text
    pub async fn get_full_content(&self, title: &str) -> Result<Record, ClientError> {
        tracing::info!("Fetching Wikipedia article: {}", title);

        let request = self
            .endpoint
            .get("")
            .query("action", "query")
            .query("prop", "extracts")
            .query("explaintext", 1)
            .query("titles", title)
            .query("format", "json");

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let Some(page) = first_page(&data) else {
                return Ok(error_record("Article not found"));
            };
            let word_count = pick_str(page, "/extract")
                .map(|text| text.split_whitespace().count())
                .unwrap_or(0);
            into_record(json!({
                "title": pick(page, "/title"),
                "content": pick(page, "/extract"),
                "page_id": pick(page, "/pageid"),
                "word_count": word_count,
                "url": self.article_url(title),
            }))
        });

        sentinel("wikipedia", "get_full_content", outcome)
    }

    /// Random main-namespace articles
    pub async fn get_random(&self, limit: usize) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get("")
            .query("action", "query")
            .query("list", "random")
            .query("rnnamespace", 0)
            .query("rnlimit", limit)
            .query("format", "json");

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let articles: Vec<Value> = data
                .pointer("/query/random")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            let title = pick_str(item, "/title").unwrap_or_default();
                            json!({
                                "title": title,
                                "page_id": pick(item, "/id"),
                                "url": self.article_url(title),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();

            into_record(json!({
                "count": articles.len(),
                "articles": articles,
            }))
        });

        sentinel("wikipedia", "get_random", outcome)
    }
}

/// opensearch answers `[query, titles, descriptions, urls]`
fn opensearch_results(data: &Value) -> Vec<Value> {
    fn column(data: &Value, index: usize) -> &[Value] {
        data.get(index)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
    let text = |column: &[Value], index: usize| {
        column
            .get(index)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    if data.as_array().map_or(0, Vec::len) < 4 {
        return Vec::new();
    }

    let (titles, descriptions, urls) = (column(data, 1), column(data, 2), column(data, 3));
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            json!({
                "title": title,
                "description": text(descriptions, i),
                "url": text(urls, i),
            })
        })
        .collect()
}

/// The first entry of `query.pages`, which is keyed by page id
fn first_page(data: &Value) -> Option<&Value> {
    data.pointer("/query/pages")
        .and_then(Value::as_object)
        .and_then(|pages| pages.values().next())
}

impl Adapter for WikipediaClient {
    fn id(&self) -> &'static str {
        "wikipedia"
    }

    fn name(&self) -> &'static str {
        "Wikipedia"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}
