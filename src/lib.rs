//! # Research Clients
//!
//! Typed clients for academic, government, news, media and web-archive data
//! APIs, reachable by name through one registry.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Result records (arXiv papers, PubMed articles, snapshots, ...)
//! - [`sources`]: Provider adapters, the source registry and the client factory
//! - [`transport`]: The HTTP seam, with a reqwest implementation and a mock
//! - [`convenience`]: One-shot helpers over the most common operations
//! - [`utils`]: Response cache and JSON helpers
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use research_clients::{ClientFactory, ClientOptions, Config};
//!
//! # async fn demo() -> Result<(), research_clients::ClientError> {
//! let factory = ClientFactory::new(Config::from_env());
//! let client = factory.create_client("arxiv", ClientOptions::new())?;
//! if let Some(arxiv) = client.as_arxiv() {
//!     for paper in arxiv.search("graph neural networks", 5, "date").await? {
//!         println!("{}", paper.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convenience;
pub mod models;
pub mod sources;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use models::{Record, ResultRecord, SortBy};
pub use sources::{
    find_source, list_sources, Adapter, Client, ClientError, ClientFactory, ClientOptions,
    ErrorMode, SourceCapabilities,
};
pub use transport::{Transport, TransportError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
