//! PubMed article record.

use serde::{Deserialize, Serialize};

use super::ResultRecord;

const PUBMED_ARTICLE_URL: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// An article summary from PubMed, optionally enriched with efetch details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubMedArticle {
    pub pmid: String,

    pub title: String,

    pub authors: Vec<String>,

    /// Full journal name, falling back to the abbreviated source
    pub journal: String,

    /// Publication date as reported by PubMed (free-form, e.g. `2023 Mar 15`)
    pub publication_date: String,

    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    pub doi: Option<String>,

    pub publication_types: Vec<String>,

    pub keywords: Vec<String>,

    /// Only populated by a details fetch
    pub mesh_terms: Option<Vec<String>>,
}

impl ResultRecord for PubMedArticle {}

impl PubMedArticle {
    /// PubMed landing page for this article
    pub fn url(&self) -> String {
        format!("{}/{}/", PUBMED_ARTICLE_URL, self.pmid)
    }

    /// Human-readable multi-line rendering, optionally numbered
    pub fn format(&self, index: Option<usize>) -> String {
        let mut out = Vec::new();

        if let Some(index) = index {
            out.push(format!("\n{}", "=".repeat(70)));
            out.push(format!("Article #{}", index));
            out.push("=".repeat(70));
        }

        out.push(format!("Title: {}", self.title));
        out.push(format!("Authors: {}", self.authors.join(", ")));
        out.push(format!("Journal: {}", self.journal));
        out.push(format!("Published: {}", self.publication_date));
        out.push(format!("PMID: {}", self.pmid));
        out.push(format!("URL: {}", self.url()));

        if let Some(doi) = &self.doi {
            out.push(format!("DOI: {}", doi));
        }
        if !self.publication_types.is_empty() {
            out.push(format!("Type: {}", self.publication_types.join(", ")));
        }
        if let Some(abstract_text) = &self.abstract_text {
            out.push(format!("\nAbstract:\n{}", abstract_text));
        }

        out.join("\n")
    }
}
