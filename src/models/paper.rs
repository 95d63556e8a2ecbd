//! Paper records from the literature sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ResultRecord;

/// A paper from arXiv
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub title: String,

    pub authors: Vec<String>,

    /// Abstract as published on arXiv
    pub summary: String,

    pub published: DateTime<Utc>,

    pub updated: DateTime<Utc>,

    /// Identifier including its version suffix, e.g. `2301.07041v2`
    pub arxiv_id: String,

    pub pdf_url: String,

    pub categories: Vec<String>,

    /// Canonical abstract page URL
    pub entry_id: String,

    pub doi: Option<String>,

    /// Author comment (page counts, conference notes)
    pub comment: Option<String>,

    pub journal_ref: Option<String>,

    pub primary_category: Option<String>,
}

impl ResultRecord for ArxivPaper {}

impl ArxivPaper {
    /// Human-readable multi-line rendering, optionally numbered
    pub fn format(&self, index: Option<usize>) -> String {
        let mut out = Vec::new();

        if let Some(index) = index {
            out.push(format!("\n{}", "=".repeat(70)));
            out.push(format!("Paper #{}", index));
            out.push("=".repeat(70));
        }

        out.push(format!("Title: {}", self.title));
        out.push(format!("Authors: {}", self.authors.join(", ")));
        out.push(format!("Published: {}", self.published.format("%Y-%m-%d")));
        out.push(format!("Updated: {}", self.updated.format("%Y-%m-%d")));
        out.push(format!("ArXiv ID: {}", self.arxiv_id));
        out.push(format!("PDF: {}", self.pdf_url));
        out.push(format!("Categories: {}", self.categories.join(", ")));

        if let Some(doi) = &self.doi {
            out.push(format!("DOI: {}", doi));
        }
        if let Some(journal) = &self.journal_ref {
            out.push(format!("Journal: {}", journal));
        }
        if let Some(comment) = &self.comment {
            out.push(format!("Comment: {}", comment));
        }

        out.push(format!("\nAbstract:\n{}", self.summary));
        out.join("\n")
    }
}

/// A paper from the Semantic Scholar graph API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarPaper {
    pub title: String,

    pub authors: Vec<String>,

    pub year: Option<i32>,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub doi: Option<String>,

    /// Topic names, when the API reports them
    pub keywords: Vec<String>,

    pub venue: Option<String>,

    pub url: Option<String>,

    pub paper_id: Option<String>,

    pub citation_count: Option<u64>,

    pub reference_count: Option<u64>,

    pub influential_citation_count: Option<u64>,
}

impl ResultRecord for ScholarPaper {}
