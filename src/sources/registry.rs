//! Registry and factory for the provider adapters.
//!
//! The table of sources is a `static`: it is built at compile time, never
//! mutated, and safe to read from any thread without locking.

use std::sync::Arc;

use super::{
    Adapter, ArchiveClient, ArxivClient, CensusClient, ClientError, ClientOptions, ErrorMode,
    FecClient, FinanceClient, GitHubClient, JudiciaryClient, MalClient, MultiArchiveClient,
    NasaClient, NewsClient, OpenLibraryClient, PubMedClient, SemanticScholarClient, WeatherClient,
    WikipediaClient, WolframClient, YouTubeClient,
};
use crate::config::Config;
use crate::transport::Transport;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        const LOOKUP = 1 << 1;
        const ARCHIVE = 1 << 2;
        const COMPUTE = 1 << 3;
        const BLOCKING = 1 << 4;
        const CACHE = 1 << 5;
    }
}

/// Construct an adapter from options
pub(crate) trait FromOptions: Sized {
    fn from_options(options: ClientOptions) -> Result<Self, ClientError>;
}

fn construct<T: FromOptions + Into<Client>>(options: ClientOptions) -> Result<Client, ClientError> {
    T::from_options(options).map(Into::into)
}

macro_rules! clients {
    ($($variant:ident($ty:ty) => $accessor:ident),* $(,)?) => {
        /// An adapter created by the factory
        #[derive(Debug)]
        pub enum Client {
            $($variant($ty),)*
        }

        impl Client {
            /// The adapter behind this client
            pub fn adapter(&self) -> &dyn Adapter {
                match self {
                    $(Client::$variant(client) => client as &dyn Adapter,)*
                }
            }

            $(
                pub fn $accessor(&self) -> Option<&$ty> {
                    match self {
                        Client::$variant(client) => Some(client),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$ty> for Client {
                fn from(client: $ty) -> Self {
                    Client::$variant(client)
                }
            }

            impl FromOptions for $ty {
                fn from_options(options: ClientOptions) -> Result<Self, ClientError> {
                    <$ty>::new(options)
                }
            }
        )*
    };
}

clients! {
    Census(CensusClient) => as_census,
    Arxiv(ArxivClient) => as_arxiv,
    SemanticScholar(SemanticScholarClient) => as_semantic_scholar,
    Archive(ArchiveClient) => as_archive,
    MultiArchive(MultiArchiveClient) => as_multi_archive,
    GitHub(GitHubClient) => as_github,
    Wikipedia(WikipediaClient) => as_wikipedia,
    News(NewsClient) => as_news,
    Weather(WeatherClient) => as_weather,
    OpenLibrary(OpenLibraryClient) => as_openlibrary,
    Nasa(NasaClient) => as_nasa,
    YouTube(YouTubeClient) => as_youtube,
    Finance(FinanceClient) => as_finance,
    PubMed(PubMedClient) => as_pubmed,
    Wolfram(WolframClient) => as_wolfram,
    Fec(FecClient) => as_fec,
    Judiciary(JudiciaryClient) => as_judiciary,
    Mal(MalClient) => as_mal,
}

/// One row of the source table
#[derive(Debug)]
pub struct SourceEntry {
    /// Canonical lowercase name
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub error_mode: ErrorMode,
    /// Environment variables holding the API key, in priority order
    pub key_variables: &'static [&'static str],
    constructor: fn(ClientOptions) -> Result<Client, ClientError>,
}

impl SourceEntry {
    /// Whether `name` (already lowercased) refers to this entry
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }

    pub fn create(&self, options: ClientOptions) -> Result<Client, ClientError> {
        (self.constructor)(options)
    }
}

/// Every available source, in listing order
pub static SOURCES: [SourceEntry; 18] = [
    SourceEntry {
        name: "census",
        aliases: &[],
        description: "US Census Bureau ACS, SAIPE and population estimates",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["CENSUS_API_KEY"],
        constructor: construct::<CensusClient>,
    },
    SourceEntry {
        name: "arxiv",
        aliases: &[],
        description: "arXiv preprint search and lookup",
        error_mode: ErrorMode::Raise,
        key_variables: &[],
        constructor: construct::<ArxivClient>,
    },
    SourceEntry {
        name: "semantic_scholar",
        aliases: &["semanticscholar"],
        description: "Semantic Scholar academic paper metadata",
        error_mode: ErrorMode::Raise,
        key_variables: &["SEMANTIC_SCHOLAR_API_KEY"],
        constructor: construct::<SemanticScholarClient>,
    },
    SourceEntry {
        name: "archive",
        aliases: &["wayback"],
        description: "Internet Archive Wayback Machine snapshots",
        error_mode: ErrorMode::Raise,
        key_variables: &[],
        constructor: construct::<ArchiveClient>,
    },
    SourceEntry {
        name: "multi_archive",
        aliases: &["archives"],
        description: "Archived copies from Wayback, archive.is, Memento and 12ft.io",
        error_mode: ErrorMode::Sentinel,
        key_variables: &[],
        constructor: construct::<MultiArchiveClient>,
    },
    SourceEntry {
        name: "github",
        aliases: &[],
        description: "GitHub repository, code and issue search",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["GITHUB_TOKEN", "GITHUB_API_KEY"],
        constructor: construct::<GitHubClient>,
    },
    SourceEntry {
        name: "wikipedia",
        aliases: &["wiki"],
        description: "Wikipedia article search and content",
        error_mode: ErrorMode::Sentinel,
        key_variables: &[],
        constructor: construct::<WikipediaClient>,
    },
    SourceEntry {
        name: "news",
        aliases: &[],
        description: "NewsAPI headlines and article search",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["NEWS_API_KEY"],
        constructor: construct::<NewsClient>,
    },
    SourceEntry {
        name: "weather",
        aliases: &["noaa"],
        description: "NOAA National Weather Service forecasts and alerts",
        error_mode: ErrorMode::Sentinel,
        key_variables: &[],
        constructor: construct::<WeatherClient>,
    },
    SourceEntry {
        name: "openlibrary",
        aliases: &["books"],
        description: "Open Library book, author and subject data",
        error_mode: ErrorMode::Sentinel,
        key_variables: &[],
        constructor: construct::<OpenLibraryClient>,
    },
    SourceEntry {
        name: "nasa",
        aliases: &[],
        description: "NASA APOD, Mars rover photos, Earth imagery and near-Earth objects",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["NASA_API_KEY"],
        constructor: construct::<NasaClient>,
    },
    SourceEntry {
        name: "youtube",
        aliases: &[],
        description: "YouTube Data API video, channel and playlist data",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["YOUTUBE_API_KEY"],
        constructor: construct::<YouTubeClient>,
    },
    SourceEntry {
        name: "finance",
        aliases: &["alphavantage", "alpha_vantage"],
        description: "Alpha Vantage stock, FX and crypto quotes",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["ALPHAVANTAGE_API_KEY"],
        constructor: construct::<FinanceClient>,
    },
    SourceEntry {
        name: "pubmed",
        aliases: &[],
        description: "PubMed biomedical literature search",
        error_mode: ErrorMode::Raise,
        key_variables: &["NCBI_API_KEY"],
        constructor: construct::<PubMedClient>,
    },
    SourceEntry {
        name: "wolfram",
        aliases: &["wolframalpha", "wolfram_alpha"],
        description: "Wolfram|Alpha computational answers",
        error_mode: ErrorMode::Raise,
        key_variables: &["WOLFRAMALPHA_APP_ID"],
        constructor: construct::<WolframClient>,
    },
    SourceEntry {
        name: "fec",
        aliases: &[],
        description: "Federal Election Commission candidates, committees and finance",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["FEC_API_KEY"],
        constructor: construct::<FecClient>,
    },
    SourceEntry {
        name: "judiciary",
        aliases: &[],
        description: "Federal judiciary judges and financial disclosures",
        error_mode: ErrorMode::Sentinel,
        key_variables: &[],
        constructor: construct::<JudiciaryClient>,
    },
    SourceEntry {
        name: "mal",
        aliases: &["myanimelist"],
        description: "MyAnimeList anime search and seasonal listings",
        error_mode: ErrorMode::Sentinel,
        key_variables: &["MAL_API_KEY", "MYANIMELIST_API_KEY"],
        constructor: construct::<MalClient>,
    },
];

/// Find a source by canonical name or alias, ignoring case
pub fn find_source(name: &str) -> Option<&'static SourceEntry> {
    let name = name.trim().to_lowercase();
    SOURCES.iter().find(|entry| entry.matches(&name))
}

/// `(name, description)` for every source, in table order
pub fn list_sources() -> Vec<(&'static str, &'static str)> {
    SOURCES
        .iter()
        .map(|entry| (entry.name, entry.description))
        .collect()
}

/// Builds adapters from a resolved configuration.
///
/// Options passed to [`create_client`](Self::create_client) win; anything they
/// leave unset is filled from the configuration.
#[derive(Debug, Clone, Default)]
pub struct ClientFactory {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    /// Factory over [`Config::from_env`]
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    /// Share one transport between every adapter this factory creates
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn list_sources(&self) -> Vec<(&'static str, &'static str)> {
        list_sources()
    }

    /// Create the adapter registered under `name` (case-insensitive)
    pub fn create_client(&self, name: &str, options: ClientOptions) -> Result<Client, ClientError> {
        let entry = find_source(name).ok_or_else(|| {
            let available: Vec<&str> = SOURCES.iter().map(|e| e.name).collect();
            ClientError::Configuration(format!(
                "Unknown data source: {}. Available: {}",
                name,
                available.join(", ")
            ))
        })?;

        tracing::debug!("Creating {} client", entry.name);
        entry.create(self.resolve(entry, options))
    }

    fn resolve(&self, entry: &SourceEntry, mut options: ClientOptions) -> ClientOptions {
        if options.api_key.is_none() {
            options.api_key = self.config.api_keys.get(entry.name).map(str::to_string);
        }
        if options.transport.is_none() {
            options.transport = self.transport.clone();
        }
        if options.timeout.is_none() {
            options.timeout = Some(self.config.timeout());
        }
        if options.user_agent.is_none() {
            options.user_agent = self.config.http.user_agent.clone();
        }
        if options.email.is_none() {
            options.email = self.config.http.contact_email.clone();
        }
        if options.cache_dir.is_none() {
            options.cache_dir = self.config.cache.directory.clone();
        }
        if options.use_cache.is_none() {
            options.use_cache = Some(self.config.cache.enabled);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn factory() -> ClientFactory {
        let mut config = Config::default();
        for key in ["news", "youtube", "finance", "wolfram", "fec", "mal"] {
            config.api_keys.set(key, "test-key");
        }
        config.cache.enabled = false;
        ClientFactory::new(config).with_transport(Arc::new(MockTransport::new()))
    }

    #[test]
    fn test_registry_basic() {
        assert_eq!(SOURCES.len(), 18);
        assert_eq!(list_sources().len(), 18);
        assert_eq!(list_sources()[0], ("census", SOURCES[0].description));
    }

    #[test]
    fn test_names_and_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for entry in SOURCES.iter() {
            assert_eq!(entry.name, entry.name.to_lowercase());
            assert!(seen.insert(entry.name), "duplicate name {}", entry.name);
            for alias in entry.aliases {
                assert!(seen.insert(*alias), "duplicate alias {}", alias);
            }
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(find_source("ArXiv").unwrap().name, "arxiv");
        assert_eq!(find_source("WAYBACK").unwrap().name, "archive");
        assert_eq!(find_source("Alpha_Vantage").unwrap().name, "finance");
        assert!(find_source("scihub").is_none());
    }

    #[test]
    fn test_every_source_constructs() {
        let factory = factory();
        for entry in SOURCES.iter() {
            let client = factory
                .create_client(entry.name, ClientOptions::new())
                .unwrap_or_else(|e| panic!("{} failed: {}", entry.name, e));
            assert_eq!(client.adapter().id(), entry.name);
            assert_eq!(client.adapter().error_mode(), entry.error_mode);
        }
    }

    #[test]
    fn test_unknown_source() {
        let err = factory()
            .create_client("nonexistent", ClientOptions::new())
            .unwrap_err();

        match err {
            ClientError::Configuration(msg) => {
                assert!(msg.contains("nonexistent"));
                assert!(msg.contains("semantic_scholar"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_mandatory_key_fails_at_construction() {
        let factory = ClientFactory::new(Config::default())
            .with_transport(Arc::new(MockTransport::new()));

        let err = factory
            .create_client("wolfram", ClientOptions::new())
            .unwrap_err();
        assert!(err.is_configuration());

        // Optional keys do not block construction
        assert!(factory.create_client("pubmed", ClientOptions::new()).is_ok());
    }

    #[test]
    fn test_capabilities() {
        let factory = factory();

        let arxiv = factory.create_client("arxiv", ClientOptions::new()).unwrap();
        assert!(arxiv.adapter().supports_search());
        assert!(arxiv.adapter().supports_lookup());

        let scholar = factory
            .create_client("semanticscholar", ClientOptions::new())
            .unwrap();
        assert!(scholar
            .adapter()
            .capabilities()
            .contains(SourceCapabilities::BLOCKING));

        let wolfram = factory.create_client("wolfram", ClientOptions::new()).unwrap();
        assert!(wolfram
            .adapter()
            .capabilities()
            .contains(SourceCapabilities::COMPUTE));
        assert!(wolfram.as_wolfram().is_some());
        assert!(wolfram.as_arxiv().is_none());
    }
}
