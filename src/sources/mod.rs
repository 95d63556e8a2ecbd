//! Provider adapters with a shared error policy.
//!
//! Each module wraps one external API. Adapters hold only their resolved
//! configuration and a shared [`Transport`](crate::transport::Transport);
//! they never read the environment and never keep state between calls.
//!
//! # Error modes
//!
//! Every adapter commits to one [`ErrorMode`] for its whole surface:
//!
//! - **Raise**: typed-record adapters (arXiv, Semantic Scholar, PubMed,
//!   Wayback, Wolfram|Alpha) return `Err(ClientError)` for transport and
//!   parse failures.
//! - **Sentinel**: mapping adapters return `Ok({"error": message})` instead,
//!   so callers can branch on the presence of the `error` key alone.
//!
//! [`ClientError::Configuration`] is always returned as an error, whatever the
//! mode, because it describes a caller mistake rather than a remote failure.
//!
//! # Adding a source
//!
//! 1. Create a module with a struct holding an [`Endpoint`]
//! 2. Implement [`Adapter`] and the provider's operations
//! 3. Add an entry to the table in `registry.rs`

mod archive;
mod arxiv;
mod census;
mod endpoint;
mod fec;
mod finance;
mod github;
mod judiciary;
mod mal;
mod multi_archive;
mod nasa;
mod news;
mod openlibrary;
mod pubmed;
mod registry;
mod semantic_scholar;
mod weather;
mod wikipedia;
mod wolfram;
mod youtube;

pub use archive::{ArchiveClient, WaybackHosts, DEFAULT_RETRY_DELAY, DEFAULT_SNAPSHOT_LIMIT};
pub use arxiv::ArxivClient;
pub use census::{AcsRequest, CensusClient};
pub use endpoint::{ClientOptions, Endpoint};
pub use fec::{CandidateSearch, ContributionSearch, DisbursementRequest, FecClient};
pub use finance::{FinanceClient, OutputSize};
pub use github::{GitHubClient, SearchOrder};
pub use judiciary::JudiciaryClient;
pub use mal::{MalClient, Season};
pub use multi_archive::{ArchiveProvider, MultiArchiveClient};
pub use nasa::NasaClient;
pub use news::NewsClient;
pub use openlibrary::OpenLibraryClient;
pub use pubmed::{PubMedClient, PubMedSearch};
pub use registry::{
    find_source, list_sources, Client, ClientFactory, SourceCapabilities, SourceEntry, SOURCES,
};
pub use semantic_scholar::SemanticScholarClient;
pub use weather::WeatherClient;
pub use wikipedia::WikipediaClient;
pub use wolfram::WolframClient;
pub use youtube::YouTubeClient;

use crate::models::Record;
use crate::transport::TransportError;

/// How an adapter reports transport and parse failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Failures are returned as `Err(ClientError)`
    Raise,
    /// Failures are returned as `Ok({"error": message})`
    Sentinel,
}

impl std::fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorMode::Raise => f.write_str("raise"),
            ErrorMode::Sentinel => f.write_str("sentinel"),
        }
    }
}

/// Behaviour shared by every provider adapter.
///
/// Provider operations are inherent methods on each adapter; this trait only
/// carries what the registry and callers need to treat adapters uniformly.
pub trait Adapter: Send + Sync + std::fmt::Debug {
    /// Canonical registry name (e.g. "arxiv", "semantic_scholar")
    fn id(&self) -> &'static str;

    /// Human-readable provider name
    fn name(&self) -> &'static str;

    /// The error mode used by every operation of this adapter
    fn error_mode(&self) -> ErrorMode;

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    fn supports_search(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::SEARCH)
    }

    fn supports_lookup(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::LOOKUP)
    }
}

/// Errors produced by adapters and the factory
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Bad or missing caller input or credentials, detected before any I/O
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network failure, timeout, or a non-2xx status
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ClientError::Configuration(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(TransportError::from_reqwest(
            &err,
            crate::transport::DEFAULT_TIMEOUT,
        ))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for ClientError {
    fn from(err: quick_xml::DeError) -> Self {
        ClientError::Parse(format!("XML: {}", err))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Configuration(format!("Invalid URL: {}", err))
    }
}

/// A sentinel mapping holding only an `error` entry
pub fn error_record(message: impl Into<String>) -> Record {
    let mut record = Record::new();
    record.insert("error".to_string(), serde_json::Value::String(message.into()));
    record
}

/// Whether a mapping is a sentinel error
pub fn is_error_record(record: &Record) -> bool {
    record.len() == 1 && record.contains_key("error")
}

/// Apply the sentinel policy to the outcome of one operation.
///
/// Transport and parse failures collapse into an error mapping; configuration
/// errors pass through untouched.
pub(crate) fn sentinel(
    source: &str,
    operation: &str,
    outcome: Result<Record, ClientError>,
) -> Result<Record, ClientError> {
    match outcome {
        Ok(record) => Ok(record),
        Err(err @ ClientError::Configuration(_)) => Err(err),
        Err(err) => {
            tracing::error!("{} {} error: {}", source, operation, err);
            Ok(error_record(err.to_string()))
        }
    }
}
