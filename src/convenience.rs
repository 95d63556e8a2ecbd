//! One-shot helpers over the most common operations.
//!
//! Each function builds a default adapter from [`Config::from_env`], performs
//! a single call and returns plain values. Long-lived callers should create
//! adapters through [`ClientFactory`] instead.
//!
//! ```no_run
//! # async fn demo() -> Result<(), research_clients::ClientError> {
//! let papers = research_clients::convenience::search_arxiv("diffusion models", 5, "date").await?;
//! for paper in papers {
//!     println!("{}", paper["title"]);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Config::from_env`]: crate::config::Config::from_env

use crate::models::{ArchiveResult, Record, ResultRecord, SortBy};
use crate::sources::{
    is_error_record, ArchiveProvider, Client, ClientError, ClientFactory, ClientOptions,
    DEFAULT_RETRY_DELAY,
};
use serde_json::Value;

/// Borrow the typed adapter behind a factory-built client
fn typed<'a, T>(client: &'a Client, name: &str, accessor: fn(&Client) -> Option<&T>) -> Result<&'a T, ClientError> {
    accessor(client).ok_or_else(|| {
        ClientError::Configuration(format!("Source {} resolved to an unexpected adapter", name))
    })
}

fn create(factory: &ClientFactory, name: &str) -> Result<Client, ClientError> {
    factory.create_client(name, ClientOptions::new())
}

/// Search arXiv; `sort_by` is `relevance` or `date`
pub async fn search_arxiv(query: &str, max_results: usize, sort_by: &str) -> Result<Vec<Record>, ClientError> {
    search_arxiv_with(&ClientFactory::from_env(), query, max_results, sort_by).await
}

pub(crate) async fn search_arxiv_with(
    factory: &ClientFactory,
    query: &str,
    max_results: usize,
    sort_by: &str,
) -> Result<Vec<Record>, ClientError> {
    let client = create(factory, "arxiv")?;
    let arxiv = typed(&client, "arxiv", Client::as_arxiv)?;
    let papers = arxiv.search(query, max_results, SortBy::from(sort_by)).await?;
    Ok(papers.iter().map(ResultRecord::to_mapping).collect())
}

/// An arXiv paper by ID, or `None` when arXiv has no such paper
pub async fn get_paper_by_id(paper_id: &str) -> Result<Option<Record>, ClientError> {
    get_paper_by_id_with(&ClientFactory::from_env(), paper_id).await
}

pub(crate) async fn get_paper_by_id_with(factory: &ClientFactory, paper_id: &str) -> Result<Option<Record>, ClientError> {
    let client = create(factory, "arxiv")?;
    let arxiv = typed(&client, "arxiv", Client::as_arxiv)?;
    Ok(arxiv.get_by_id(paper_id).await?.map(|paper| paper.to_mapping()))
}

/// Search Semantic Scholar with the default field set
pub async fn search_papers(query: &str, limit: usize) -> Result<Vec<Record>, ClientError> {
    search_papers_with(&ClientFactory::from_env(), query, limit).await
}

pub(crate) async fn search_papers_with(factory: &ClientFactory, query: &str, limit: usize) -> Result<Vec<Record>, ClientError> {
    let client = create(factory, "semantic_scholar")?;
    let scholar = typed(&client, "semantic_scholar", Client::as_semantic_scholar)?;
    let papers = scholar.search(query, limit, None).await?;
    Ok(papers.iter().map(ResultRecord::to_mapping).collect())
}

/// A Semantic Scholar paper by DOI, or `None` when unknown
pub async fn get_paper_by_doi(doi: &str) -> Result<Option<Record>, ClientError> {
    get_paper_by_doi_with(&ClientFactory::from_env(), doi).await
}

pub(crate) async fn get_paper_by_doi_with(factory: &ClientFactory, doi: &str) -> Result<Option<Record>, ClientError> {
    let client = create(factory, "semantic_scholar")?;
    let scholar = typed(&client, "semantic_scholar", Client::as_semantic_scholar)?;
    Ok(scholar.get_by_doi(doi, None).await?.map(|paper| paper.to_mapping()))
}

/// Search PubMed; `sort_by` is `relevance` or `date`
pub async fn search_pubmed(query: &str, max_results: usize, sort_by: &str) -> Result<Vec<Record>, ClientError> {
    search_pubmed_with(&ClientFactory::from_env(), query, max_results, sort_by).await
}

pub(crate) async fn search_pubmed_with(
    factory: &ClientFactory,
    query: &str,
    max_results: usize,
    sort_by: &str,
) -> Result<Vec<Record>, ClientError> {
    let client = create(factory, "pubmed")?;
    let pubmed = typed(&client, "pubmed", Client::as_pubmed)?;
    let articles = pubmed.search(query, max_results, SortBy::from(sort_by)).await?;
    Ok(articles.iter().map(ResultRecord::to_mapping).collect())
}

/// A PubMed article by PMID, or `None` when unknown
pub async fn get_article_by_pmid(pmid: &str) -> Result<Option<Record>, ClientError> {
    get_article_by_pmid_with(&ClientFactory::from_env(), pmid).await
}

pub(crate) async fn get_article_by_pmid_with(factory: &ClientFactory, pmid: &str) -> Result<Option<Record>, ClientError> {
    let client = create(factory, "pubmed")?;
    let pubmed = typed(&client, "pubmed", Client::as_pubmed)?;
    Ok(pubmed.get_by_id(pmid).await?.map(|article| article.to_mapping()))
}

/// Capture a URL in the Wayback Machine, optionally waiting for the snapshot
pub async fn archive_url(url: &str, wait: bool) -> Result<ArchiveResult, ClientError> {
    archive_url_with(&ClientFactory::from_env(), url, wait).await
}

pub(crate) async fn archive_url_with(factory: &ClientFactory, url: &str, wait: bool) -> Result<ArchiveResult, ClientError> {
    let client = create(factory, "archive")?;
    let archive = typed(&client, "archive", Client::as_archive)?;
    archive.archive_url(url, wait, DEFAULT_RETRY_DELAY).await
}

/// URL of the most recent Wayback snapshot, if any
pub async fn get_latest_archive(url: &str) -> Result<Option<String>, ClientError> {
    get_latest_archive_with(&ClientFactory::from_env(), url).await
}

pub(crate) async fn get_latest_archive_with(factory: &ClientFactory, url: &str) -> Result<Option<String>, ClientError> {
    let client = create(factory, "archive")?;
    let archive = typed(&client, "archive", Client::as_archive)?;
    Ok(archive
        .get_latest_snapshot(url)
        .await?
        .map(|snapshot| snapshot.archive_url))
}

/// Archived URL from one provider (`wayback`, `archiveis`, `memento`, `12ft`)
pub async fn get_archive(url: &str, provider: &str) -> Result<Option<String>, ClientError> {
    get_archive_with(&ClientFactory::from_env(), url, provider).await
}

pub(crate) async fn get_archive_with(factory: &ClientFactory, url: &str, provider: &str) -> Result<Option<String>, ClientError> {
    let provider: ArchiveProvider = provider.parse()?;
    let client = create(factory, "multi_archive")?;
    let archives = typed(&client, "multi_archive", Client::as_multi_archive)?;

    let record = archives.get_archive(url, provider, false).await;
    if is_error_record(&record) {
        return Ok(None);
    }
    Ok(record
        .get("archive_url")
        .and_then(Value::as_str)
        .map(str::to_string))
}

/// Short Wolfram|Alpha answer, or `Error: ...` when the query was not understood
pub async fn wolfram_query(query: &str) -> Result<String, ClientError> {
    wolfram_query_with(&ClientFactory::from_env(), query).await
}

pub(crate) async fn wolfram_query_with(factory: &ClientFactory, query: &str) -> Result<String, ClientError> {
    let client = create(factory, "wolfram")?;
    let wolfram = typed(&client, "wolfram", Client::as_wolfram)?;
    Ok(answer_text(wolfram.query(query).await?))
}

/// Evaluate an expression with Wolfram|Alpha
pub async fn wolfram_calculate(expression: &str) -> Result<String, ClientError> {
    wolfram_calculate_with(&ClientFactory::from_env(), expression).await
}

pub(crate) async fn wolfram_calculate_with(factory: &ClientFactory, expression: &str) -> Result<String, ClientError> {
    let client = create(factory, "wolfram")?;
    let wolfram = typed(&client, "wolfram", Client::as_wolfram)?;
    Ok(answer_text(wolfram.calculate(expression).await?))
}

fn answer_text(result: crate::models::WolframResult) -> String {
    if result.success {
        result.result.unwrap_or_default()
    } else {
        format!("Error: {}", result.error.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::{HttpResponse, MockTransport, TransportError};
    use serde_json::json;
    use std::sync::Arc;

    fn factory(mock: Arc<MockTransport>) -> ClientFactory {
        let mut config = Config::default();
        config.api_keys.set("wolfram", "APP-1");
        config.cache.enabled = false;
        ClientFactory::new(config).with_transport(mock)
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>arXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-01-01T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2301.07041v2</id>
    <updated>2023-02-01T00:00:00Z</updated>
    <published>2023-01-17T00:00:00Z</published>
    <title>A Test Paper</title>
    <summary>Abstract text.</summary>
    <author><name>Ada Lovelace</name></author>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[tokio::test]
    async fn test_search_arxiv_returns_mappings() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("https://export.arxiv.org/", HttpResponse::new(200, ATOM));

        let papers = search_arxiv_with(&factory(mock.clone()), "test", 5, "bogus")
            .await
            .unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0]["title"], "A Test Paper");
        assert_eq!(
            mock.last_request().unwrap().query_value("sortBy"),
            Some("relevance")
        );
    }

    #[tokio::test]
    async fn test_get_archive_unknown_provider() {
        let mock = Arc::new(MockTransport::new());
        let err = get_archive_with(&factory(mock.clone()), "https://example.com", "library")
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_archive_by_provider() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("https://12ft.io/", HttpResponse::new(200, ""));
        mock.fail(
            "https://archive.is/",
            TransportError::Connect("connection refused".to_string()),
        );
        let factory = factory(mock);

        let url = get_archive_with(&factory, "https://example.com", "12ft").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://12ft.io/https://example.com"));

        let missing = get_archive_with(&factory, "https://example.com", "archiveis").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_latest_archive_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://archive.org/wayback/available",
            200,
            json!({ "url": "example.com", "archived_snapshots": {} }),
        );

        let latest = get_latest_archive_with(&factory(mock), "example.com").await.unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn test_wolfram_strings() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("https://api.wolframalpha.com/v1/result", HttpResponse::new(200, "42"));
        let factory = factory(mock.clone());

        assert_eq!(wolfram_calculate_with(&factory, "6*7").await.unwrap(), "42");

        mock.respond("https://api.wolframalpha.com/v1/result", HttpResponse::new(501, ""));
        let text = wolfram_query_with(&factory, "blorp").await.unwrap();
        assert!(text.starts_with("Error: "));
    }
}
