//! NewsAPI source: headlines, full-archive search and publisher listing.

use serde_json::json;
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
};
use crate::utils::{into_record, map_array, pick};

const NEWS_API_BASE: &str = "https://newsapi.org/v2";

/// NewsAPI client; the key is mandatory
#[derive(Debug, Clone)]
pub struct NewsClient {
    endpoint: Endpoint,
    api_key: String,
}

impl NewsClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let api_key = options.required_key("NewsAPI", "NEWS_API_KEY")?;
        let endpoint = options.endpoint(NEWS_API_BASE, Duration::from_secs(30))?;
        Ok(Self { endpoint, api_key })
    }

    /// Breaking headlines for a country, optionally narrowed by category or keyword
    pub async fn get_top_headlines(
        &self,
        country: &str,
        category: Option<&str>,
        query: Option<&str>,
        page_size: usize,
    ) -> Result<Record, ClientError> {
        tracing::info!("Fetching top headlines for {}", country);

        let request = self
            .endpoint
            .get("/top-headlines")
            .query("apiKey", &self.api_key)
            .query("country", country)
            .query("pageSize", page_size)
            .query_opt("category", category)
            .query_opt("q", query);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "status": pick(&data, "/status"),
                "total_results": data.get("totalResults").cloned().unwrap_or(json!(0)),
                "articles": map_array(&data, "/articles", |item| json!({
                    "title": pick(item, "/title"),
                    "description": pick(item, "/description"),
                    "url": pick(item, "/url"),
                    "source": pick(item, "/source/name"),
                    "published_at": pick(item, "/publishedAt"),
                    "author": pick(item, "/author"),
                    "image_url": pick(item, "/urlToImage"),
                })),
            }))
        });

        sentinel("news", "get_top_headlines", outcome)
    }

    /// Search every indexed article.
    ///
    /// Dates are `YYYY-MM-DD`; `sort_by` is `relevancy`, `popularity` or `publishedAt`.
    pub async fn search_everything(
        &self,
        query: &str,
        from_date: Option<&str>,
        to_date: Option<&str>,
        language: &str,
        sort_by: &str,
        page_size: usize,
    ) -> Result<Record, ClientError> {
        tracing::info!("Searching news: {}", query);

        let request = self
            .endpoint
            .get("/everything")
            .query("apiKey", &self.api_key)
            .query("q", query)
            .query("language", language)
            .query("sortBy", sort_by)
            .query("pageSize", page_size)
            .query_opt("from", from_date)
            .query_opt("to", to_date);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "query": query,
                "total_results": data.get("totalResults").cloned().unwrap_or(json!(0)),
                "articles": map_array(&data, "/articles", |item| json!({
                    "title": pick(item, "/title"),
                    "description": pick(item, "/description"),
                    "content": pick(item, "/content"),
                    "url": pick(item, "/url"),
                    "source": pick(item, "/source/name"),
                    "published_at": pick(item, "/publishedAt"),
                    "author": pick(item, "/author"),
                })),
            }))
        });

        sentinel("news", "search_everything", outcome)
    }

    pub async fn get_sources(
        &self,
        category: Option<&str>,
        language: &str,
        country: Option<&str>,
    ) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get("/sources")
            .query("apiKey", &self.api_key)
            .query("language", language)
            .query_opt("category", category)
            .query_opt("country", country);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let sources = map_array(&data, "/sources", |item| json!({
                "id": pick(item, "/id"),
                "name": pick(item, "/name"),
                "description": pick(item, "/description"),
                "url": pick(item, "/url"),
                "category": pick(item, "/category"),
                "country": pick(item, "/country"),
                "language": pick(item, "/language"),
            }));
            into_record(json!({
                "count": sources.as_array().map_or(0, Vec::len),
                "sources": sources,
            }))
        });

        sentinel("news", "get_sources", outcome)
    }
}

impl Adapter for NewsClient {
    fn id(&self) -> &'static str {
        "news"
    }

    fn name(&self) -> &'static str {
        "NewsAPI"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }
}
