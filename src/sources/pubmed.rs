//! PubMed research source implementation.
//!
//! Uses the NCBI E-utilities: `esearch` resolves a query to PMIDs,
//! `esummary` turns PMIDs into article summaries and `efetch` supplies the
//! abstract and MeSH headings that summaries do not carry.

use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{PubMedArticle, SortBy};
use crate::sources::{Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities};
use crate::transport::HttpRequest;

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Largest `retmax` esearch accepts
pub const MAX_RESULTS: usize = 10_000;

/// Parameters for a PubMed search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubMedSearch {
    pub max_results: usize,
    pub sort_by: SortBy,
    /// Publication date filter, e.g. `2020/01/01:2024/01/01`
    pub date_range: Option<String>,
    /// Journal name filter
    pub journal: Option<String>,
}

impl Default for PubMedSearch {
    fn default() -> Self {
        Self {
            max_results: 10,
            sort_by: SortBy::Relevance,
            date_range: None,
            journal: None,
        }
    }
}

impl PubMedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn sort_by(mut self, sort_by: impl Into<SortBy>) -> Self {
        self.sort_by = sort_by.into();
        self
    }

    pub fn date_range(mut self, range: impl Into<String>) -> Self {
        self.date_range = Some(range.into());
        self
    }

    pub fn journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    /// The full esearch term with filters appended
    fn term(&self, query: &str) -> String {
        let mut term = query.to_string();
        if let Some(journal) = &self.journal {
            term.push_str(&format!(" AND {}[Journal]", journal));
        }
        if let Some(range) = &self.date_range {
            term.push_str(&format!(" AND {}[Date - Publication]", range));
        }
        term
    }
}

/// PubMed research source
#[derive(Debug, Clone)]
pub struct PubMedClient {
    endpoint: Endpoint,
    api_key: Option<String>,
    email: Option<String>,
}

impl PubMedClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let endpoint = options.endpoint(EUTILS_BASE_URL, Duration::from_secs(30))?;
        Ok(Self {
            endpoint,
            api_key: options.key().map(str::to_string),
            email: options.email.clone().filter(|e| !e.trim().is_empty()),
        })
    }

    /// Strip `PMID:` prefixes and surrounding whitespace
    pub fn clean_pmid(pmid: &str) -> String {
        pmid.trim()
            .replace("PMID:", "")
            .replace("pmid:", "")
            .trim()
            .to_string()
    }

    /// Add the API key and contact email when configured
    fn with_api_params(&self, request: HttpRequest) -> HttpRequest {
        request
            .query_opt("api_key", self.api_key.as_deref())
            .query_opt("email", self.email.as_deref())
    }

    /// Build the esearch request
    pub fn search_request(&self, query: &str, search: &PubMedSearch) -> HttpRequest {
        let sort = match search.sort_by {
            SortBy::Relevance => "relevance",
            SortBy::Date => "pub date",
        };

        let request = self
            .endpoint
            .get("esearch.fcgi")
            .query("db", "pubmed")
            .query("term", search.term(query))
            .query("retmax", search.max_results.clamp(1, MAX_RESULTS))
            .query("retmode", "json")
            .query("sort", sort);

        self.with_api_params(request)
    }

    /// Search with default filters
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        let search = PubMedSearch::new()
            .max_results(max_results)
            .sort_by(sort_by);
        self.search_with(query, &search).await
    }

    /// Search with journal and date filters
    pub async fn search_with(
        &self,
        query: &str,
        search: &PubMedSearch,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        tracing::info!(
            "Searching PubMed for: '{}' (max: {}, sort: {})",
            query,
            search.max_results,
            search.sort_by
        );

        let request = self.search_request(query, search);
        let data = self.endpoint.fetch_json(&request).await?;

        let ids: Vec<String> = data
            .pointer("/esearchresult/idlist")
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            tracing::info!("No results found for PubMed query: {}", query);
            return Ok(Vec::new());
        }

        tracing::info!("Found {} article IDs, fetching summaries", ids.len());
        let articles = self.summaries(&ids).await?;

        tracing::info!("Retrieved {} articles for query: '{}'", articles.len(), query);
        Ok(articles)
    }

    async fn summaries(&self, pmids: &[String]) -> Result<Vec<PubMedArticle>, ClientError> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.with_api_params(
            self.endpoint
                .get("esummary.fcgi")
                .query("db", "pubmed")
                .query("id", pmids.join(","))
                .query("retmode", "json"),
        );

        let data = self.endpoint.fetch_json(&request).await?;
        parse_summaries(&data, pmids)
    }

    /// Get a single article by PMID
    pub async fn get_by_id(&self, pmid: &str) -> Result<Option<PubMedArticle>, ClientError> {
        let clean = Self::clean_pmid(pmid);
        if clean.is_empty() {
            return Err(ClientError::Configuration("Empty PMID".to_string()));
        }

        tracing::info!("Fetching PubMed article: {}", clean);

        let article = self.summaries(&[clean.clone()]).await?.into_iter().next();
        if article.is_none() {
            tracing::warn!("Article not found: {}", clean);
        }
        Ok(article)
    }

    /// Get several articles; unknown PMIDs are skipped
    pub async fn get_by_ids(&self, pmids: &[&str]) -> Result<Vec<PubMedArticle>, ClientError> {
        let clean: Vec<String> = pmids
            .iter()
            .map(|p| Self::clean_pmid(p))
            .filter(|p| !p.is_empty())
            .collect();

        tracing::info!("Fetching {} PubMed articles", clean.len());
        let articles = self.summaries(&clean).await?;
        tracing::info!("Retrieved {}/{} articles", articles.len(), clean.len());
        Ok(articles)
    }

    /// Search by author, newest first
    pub async fn search_by_author(
        &self,
        author: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        self.search(&format!("{}[Author]", author), max_results, sort_by)
            .await
    }

    /// Search by Medical Subject Heading
    pub async fn search_by_mesh(
        &self,
        mesh_term: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        self.search(&format!("{}[MeSH Terms]", mesh_term), max_results, sort_by)
            .await
    }

    pub async fn search_clinical_trials(
        &self,
        query: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        let term = format!("{} AND \"Clinical Trial\"[Publication Type]", query);
        self.search(&term, max_results, sort_by).await
    }

    pub async fn search_reviews(
        &self,
        query: &str,
        max_results: usize,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        let term = format!("{} AND \"Review\"[Publication Type]", query);
        self.search(&term, max_results, sort_by).await
    }

    /// Enrich summaries with abstracts, MeSH terms and keywords from efetch.
    ///
    /// Articles efetch does not return are passed through unchanged.
    pub async fn fetch_details(
        &self,
        articles: Vec<PubMedArticle>,
    ) -> Result<Vec<PubMedArticle>, ClientError> {
        if articles.is_empty() {
            return Ok(articles);
        }

        let ids: Vec<&str> = articles.iter().map(|a| a.pmid.as_str()).collect();
        tracing::info!("Fetching details for {} PubMed articles", ids.len());

        let request = self.with_api_params(
            self.endpoint
                .get("efetch.fcgi")
                .query("db", "pubmed")
                .query("id", ids.join(","))
                .query("retmode", "xml"),
        );

        let response = self.endpoint.send(&request).await?;
        let mut details = parse_details(&response.body)?;

        Ok(articles
            .into_iter()
            .map(|mut article| {
                if let Some(detail) = details.remove(&article.pmid) {
                    if article.abstract_text.is_none() {
                        article.abstract_text = detail.abstract_text;
                    }
                    if article.keywords.is_empty() {
                        article.keywords = detail.keywords;
                    }
                    article.mesh_terms = Some(detail.mesh_terms);
                }
                article
            })
            .collect())
    }

    pub fn format_article(&self, article: &PubMedArticle, index: Option<usize>) -> String {
        article.format(index)
    }
}

impl Adapter for PubMedClient {
    fn id(&self) -> &'static str {
        "pubmed"
    }

    fn name(&self) -> &'static str {
        "PubMed"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Raise
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}

/// Build articles from an esummary document, in `uids` order
fn parse_summaries(data: &Value, requested: &[String]) -> Result<Vec<PubMedArticle>, ClientError> {
    let result = data
        .get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::Parse("esummary response has no result".to_string()))?;

    let uids: Vec<String> = match result.get("uids").and_then(Value::as_array) {
        Some(uids) => uids
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => requested.to_vec(),
    };

    Ok(uids
        .iter()
        .filter_map(|uid| {
            let summary = result.get(uid)?;
            if summary.get("error").is_some() {
                tracing::debug!("No summary for PMID {}", uid);
                return None;
            }
            Some(from_summary(uid, summary))
        })
        .collect())
}

fn from_summary(pmid: &str, data: &Value) -> PubMedArticle {
    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
    let strings = |key: &str| -> Vec<String> {
        data.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    let authors = data
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let journal = text("fulljournalname")
        .filter(|j| !j.is_empty())
        .or_else(|| text("source"))
        .unwrap_or_default();

    PubMedArticle {
        pmid: pmid.to_string(),
        title: text("title").unwrap_or_default(),
        authors,
        journal,
        publication_date: text("pubdate").unwrap_or_default(),
        abstract_text: text("abstract").filter(|a| !a.is_empty()),
        doi: text("elocationid").as_deref().and_then(extract_doi),
        publication_types: strings("pubtype"),
        keywords: strings("keywords"),
        mesh_terms: None,
    }
}

/// Pull the DOI out of an `elocationid` such as `pii: S01. doi: 10.1/x`
fn extract_doi(elocation: &str) -> Option<String> {
    let lower = elocation.to_lowercase();
    let start = lower.find("doi:")? + 4;
    elocation
        .get(start..)?
        .split_whitespace()
        .next()
        .map(|doi| doi.trim_end_matches('.').to_string())
}

#[derive(Debug, Default)]
struct ArticleDetails {
    abstract_text: Option<String>,
    mesh_terms: Vec<String>,
    keywords: Vec<String>,
}

/// Parse an efetch document into details keyed by PMID
fn parse_details(xml: &str) -> Result<HashMap<String, ArticleDetails>, ClientError> {
    let set: PubmedArticleSet = from_str(xml)?;

    let mut details = HashMap::new();
    for article in set.articles {
        let citation = article.MedlineCitation;
        let pmid = citation.PMID.text.trim().to_string();

        let abstract_text = citation
            .Article
            .and_then(|a| a.Abstract)
            .map(|a| {
                a.texts
                    .into_iter()
                    .filter(|t| !t.text.trim().is_empty())
                    .map(|t| match t.label {
                        Some(label) => format!("{}: {}", label, t.text.trim()),
                        None => t.text.trim().to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|text| !text.is_empty());

        let mesh_terms = citation
            .MeshHeadingList
            .map(|list| {
                list.headings
                    .into_iter()
                    .map(|h| h.DescriptorName.text.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let keywords = citation
            .KeywordList
            .map(|list| {
                list.keywords
                    .into_iter()
                    .map(|k| k.text.trim().to_string())
                    .collect()
            })
            .unwrap_or_default();

        details.insert(
            pmid,
            ArticleDetails {
                abstract_text,
                mesh_terms,
                keywords,
            },
        );
    }

    Ok(details)
}

// ===== efetch XML Types =====

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticleXml>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct PubmedArticleXml {
    MedlineCitation: MedlineCitation,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MedlineCitation {
    PMID: TextNode,
    Article: Option<ArticleXml>,
    MeshHeadingList: Option<MeshHeadingList>,
    KeywordList: Option<KeywordList>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct ArticleXml {
    Abstract: Option<AbstractXml>,
}

#[derive(Debug, Deserialize)]
struct AbstractXml {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct MeshHeadingList {
    #[serde(rename = "MeshHeading", default)]
    headings: Vec<MeshHeading>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MeshHeading {
    DescriptorName: TextNode,
}

#[derive(Debug, Deserialize)]
struct KeywordList {
    #[serde(rename = "Keyword", default)]
    keywords: Vec<TextNode>,
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    text: String,
}
