//! Integration tests for Research Clients
//!
//! These tests exercise the registry, the factory, both error modes and the
//! real reqwest transport against a local mock server.

use mockito::Matcher;
use research_clients::config::{load_config, Config};
use research_clients::models::{
    ArchiveResult, ArxivPaper, PubMedArticle, Record, ResultRecord, Snapshot, SortBy,
};
use research_clients::sources::{
    error_record, find_source, is_error_record, list_sources, AcsRequest, ArchiveProvider,
    CandidateSearch, ClientError, ClientFactory, ClientOptions, ContributionSearch,
    DisbursementRequest, ErrorMode, OutputSize, SearchOrder, Season, SourceCapabilities, SOURCES,
};
use research_clients::transport::{HttpResponse, MockTransport, TransportError};
use research_clients::utils::ResponseCache;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

/// A factory with every mandatory key set and a scripted transport
fn factory(mock: Arc<MockTransport>) -> ClientFactory {
    let mut config = Config::default();
    for key in ["news", "youtube", "finance", "wolfram", "fec", "mal"] {
        config.api_keys.set(key, "test-key");
    }
    config.cache.enabled = false;
    ClientFactory::new(config).with_transport(mock)
}

#[test]
fn test_all_sources_registered() {
    assert_eq!(SOURCES.len(), 18);
    assert_eq!(list_sources().len(), 18);

    let mock = Arc::new(MockTransport::new());
    let factory = factory(mock.clone());
    for (name, _) in list_sources() {
        let client = factory
            .create_client(name, ClientOptions::new())
            .unwrap_or_else(|e| panic!("{} failed to construct: {}", name, e));
        assert_eq!(client.adapter().id(), name);
    }

    // Construction alone never touches the network
    assert!(mock.requests().is_empty());
}

#[test]
fn test_lookup_is_case_insensitive_and_alias_aware() {
    assert_eq!(find_source("ArXiv").map(|e| e.name), Some("arxiv"));
    assert_eq!(find_source("  WAYBACK ").map(|e| e.name), Some("archive"));
    assert_eq!(find_source("myanimelist").map(|e| e.name), Some("mal"));
    assert!(find_source("scopus").is_none());
}

#[test]
fn test_unknown_source_lists_available() {
    let err = factory(Arc::new(MockTransport::new()))
        .create_client("scopus", ClientOptions::new())
        .unwrap_err();

    assert!(err.is_configuration());
    let message = err.to_string();
    assert!(message.contains("Unknown data source: scopus"));
    assert!(message.contains("arxiv"));
}

#[test]
fn test_missing_mandatory_key() {
    let mut config = Config::default();
    config.cache.enabled = false;
    let factory = ClientFactory::new(config).with_transport(Arc::new(MockTransport::new()));

    for name in ["news", "youtube", "finance", "wolfram", "mal"] {
        let err = factory.create_client(name, ClientOptions::new()).unwrap_err();
        assert!(err.is_configuration(), "{} should require a key", name);
        assert!(err.to_string().contains("API key required"));
    }

    // NASA falls back to the public demo key
    assert!(factory.create_client("nasa", ClientOptions::new()).is_ok());
}

#[test]
fn test_error_modes_match_adapters() {
    let factory = factory(Arc::new(MockTransport::new()));
    for entry in SOURCES.iter() {
        let client = factory.create_client(entry.name, ClientOptions::new()).unwrap();
        assert_eq!(client.adapter().error_mode(), entry.error_mode, "{}", entry.name);
    }

    let raising: Vec<&str> = SOURCES
        .iter()
        .filter(|e| e.error_mode == ErrorMode::Raise)
        .map(|e| e.name)
        .collect();
    assert_eq!(raising, ["arxiv", "semantic_scholar", "archive", "pubmed", "wolfram"]);
}

#[test]
fn test_capabilities() {
    let factory = factory(Arc::new(MockTransport::new()));
    let arxiv = factory.create_client("arxiv", ClientOptions::new()).unwrap();
    assert!(arxiv.adapter().supports_search());
    assert!(arxiv.adapter().capabilities().contains(SourceCapabilities::LOOKUP));

    let wolfram = factory.create_client("wolfram", ClientOptions::new()).unwrap();
    assert!(wolfram.adapter().capabilities().contains(SourceCapabilities::COMPUTE));
}

#[tokio::test]
async fn test_raise_mode_surfaces_transport_errors() {
    let mock = Arc::new(MockTransport::new());
    mock.respond("https://export.arxiv.org/", HttpResponse::new(503, "busy"));

    let client = factory(mock).create_client("arxiv", ClientOptions::new()).unwrap();
    let err = client
        .as_arxiv()
        .unwrap()
        .search("quantum", 5, "relevance")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Status { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_sentinel_mode_swallows_transport_errors() {
    let mock = Arc::new(MockTransport::new());
    mock.fail(
        "https://en.wikipedia.org/",
        TransportError::Connect("connection refused".to_string()),
    );

    let client = factory(mock).create_client("wikipedia", ClientOptions::new()).unwrap();
    let result = client.as_wikipedia().unwrap().search("Rust", 5).await.unwrap();

    assert!(is_error_record(&result));
    assert!(result["error"].as_str().unwrap().contains("connection refused"));
}

/// A factory whose transport refuses every connection
fn unreachable_network() -> (Arc<MockTransport>, ClientFactory) {
    let mock = Arc::new(MockTransport::new());
    mock.fail("http", TransportError::Connect("connection refused".to_string()));
    let factory = factory(mock.clone());
    (mock, factory)
}

#[tokio::test]
async fn test_every_raise_operation_surfaces_transport_errors() {
    let (_, factory) = unreachable_network();
    let client = |name: &str| factory.create_client(name, ClientOptions::new()).unwrap();

    let arxiv_client = client("arxiv");
    let arxiv = arxiv_client.as_arxiv().unwrap();
    let scholar_client = client("semantic_scholar");
    let scholar = scholar_client.as_semantic_scholar().unwrap();
    let wayback_client = client("archive");
    let wayback = wayback_client.as_archive().unwrap();
    let pubmed_client = client("pubmed");
    let pubmed = pubmed_client.as_pubmed().unwrap();
    let wolfram_client = client("wolfram");
    let wolfram = wolfram_client.as_wolfram().unwrap();

    let article = PubMedArticle {
        pmid: "31452104".to_string(),
        title: "Metformin and longevity.".to_string(),
        authors: Vec::new(),
        journal: "Cell metabolism".to_string(),
        publication_date: "2019 Aug".to_string(),
        abstract_text: None,
        doi: None,
        publication_types: Vec::new(),
        keywords: Vec::new(),
        mesh_terms: None,
    };
    let at = chrono::NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let outcomes: Vec<(&str, Result<(), ClientError>)> = vec![
        ("arxiv.search", arxiv.search("q", 5, "relevance").await.map(drop)),
        ("arxiv.get_by_id", arxiv.get_by_id("2301.07041").await.map(drop)),
        ("arxiv.get_by_ids", arxiv.get_by_ids(&["2301.07041"]).await.map(drop)),
        ("arxiv.search_by_author", arxiv.search_by_author("Ada", 5, "date").await.map(drop)),
        ("arxiv.search_by_category", arxiv.search_by_category("cs.LG", 5, "date").await.map(drop)),
        ("semantic_scholar.search", scholar.search("q", 5, None).await.map(drop)),
        ("semantic_scholar.search_blocking", {
            let scholar = scholar.clone();
            tokio::task::spawn_blocking(move || scholar.search_blocking("q", 5, None).map(drop))
                .await
                .unwrap()
        }),
        ("semantic_scholar.get_by_doi", scholar.get_by_doi("10.1/x", None).await.map(drop)),
        ("semantic_scholar.get_by_arxiv_id", scholar.get_by_arxiv_id("2301.07041", None).await.map(drop)),
        ("archive.get_latest_snapshot", wayback.get_latest_snapshot("example.com").await.map(drop)),
        ("archive.get_snapshot_at_timestamp", wayback.get_snapshot_at_timestamp("example.com", at).await.map(drop)),
        ("archive.get_all_snapshots", wayback.get_all_snapshots("example.com", 10, None, None).await.map(drop)),
        ("archive.archive_url", wayback.archive_url("example.com", false, std::time::Duration::ZERO).await.map(drop)),
        ("pubmed.search", pubmed.search("q", 5, "relevance").await.map(drop)),
        ("pubmed.get_by_id", pubmed.get_by_id("31452104").await.map(drop)),
        ("pubmed.get_by_ids", pubmed.get_by_ids(&["31452104"]).await.map(drop)),
        ("pubmed.search_by_author", pubmed.search_by_author("Smith J", 5, "date").await.map(drop)),
        ("pubmed.search_by_mesh", pubmed.search_by_mesh("Metformin", 5, "date").await.map(drop)),
        ("pubmed.search_clinical_trials", pubmed.search_clinical_trials("q", 5, "date").await.map(drop)),
        ("pubmed.search_reviews", pubmed.search_reviews("q", 5, "date").await.map(drop)),
        ("pubmed.fetch_details", pubmed.fetch_details(vec![article]).await.map(drop)),
        ("wolfram.query", wolfram.query("2+2").await.map(drop)),
        ("wolfram.query_spoken", wolfram.query_spoken("2+2").await.map(drop)),
        ("wolfram.query_full", wolfram.query_full("2+2").await.map(drop)),
        ("wolfram.calculate", wolfram.calculate("2+2").await.map(drop)),
        ("wolfram.convert", wolfram.convert("1", "mile", "km").await.map(drop)),
        ("wolfram.define", wolfram.define("entropy").await.map(drop)),
    ];

    for (operation, outcome) in outcomes {
        assert!(
            matches!(outcome, Err(ClientError::Transport(_))),
            "{} should raise a transport error, got {:?}",
            operation,
            outcome
        );
    }

    // The image answer is only a URL and never touches the network
    assert!(wolfram.query_image_url("2+2").is_ok());
}

#[tokio::test]
async fn test_every_sentinel_operation_returns_error_record() {
    let (mock, factory) = unreachable_network();
    let client = |name: &str| factory.create_client(name, ClientOptions::new()).unwrap();

    let census_client = client("census");
    let census = census_client.as_census().unwrap();
    let github_client = client("github");
    let github = github_client.as_github().unwrap();
    let wikipedia_client = client("wikipedia");
    let wikipedia = wikipedia_client.as_wikipedia().unwrap();
    let weather_client = client("weather");
    let weather = weather_client.as_weather().unwrap();
    let openlibrary_client = client("openlibrary");
    let openlibrary = openlibrary_client.as_openlibrary().unwrap();
    let nasa_client = client("nasa");
    let nasa = nasa_client.as_nasa().unwrap();
    let news_client = client("news");
    let news = news_client.as_news().unwrap();
    let youtube_client = client("youtube");
    let youtube = youtube_client.as_youtube().unwrap();
    let finance_client = client("finance");
    let finance = finance_client.as_finance().unwrap();
    let fec_client = client("fec");
    let fec = fec_client.as_fec().unwrap();
    let mal_client = client("mal");
    let mal = mal_client.as_mal().unwrap();
    let archives_client = client("multi_archive");
    let archives = archives_client.as_multi_archive().unwrap();

    let acs = AcsRequest::new(2022).variable("B01003_001E", "total_population");
    let url = "https://example.com";

    let outcomes: Vec<(&str, Result<Record, ClientError>)> = vec![
        ("census.fetch_acs", census.fetch_acs(&acs).await),
        ("census.fetch_saipe", census.fetch_saipe(2022, "state", None).await),
        ("census.fetch_population", census.fetch_population(2022, "state:*", None).await),
        ("github.search_repositories", github.search_repositories("rust", "stars", SearchOrder::Desc, 5).await),
        ("github.search_code", github.search_code("fn main", 5).await),
        ("github.get_repository", github.get_repository("rust-lang", "rust").await),
        ("github.search_issues", github.search_issues("bug", "created", SearchOrder::Asc, 5).await),
        ("wikipedia.search", wikipedia.search("Rust", 5).await),
        ("wikipedia.get_summary", wikipedia.get_summary("Rust").await),
        ("wikipedia.get_full_content", wikipedia.get_full_content("Rust").await),
        ("wikipedia.get_random", wikipedia.get_random(3).await),
        ("weather.get_current_weather", weather.get_current_weather(38.9, -77.0).await),
        ("weather.get_forecast", weather.get_forecast(38.9, -77.0, 3).await),
        ("weather.get_alerts", weather.get_alerts("VA").await),
        ("openlibrary.search_books", openlibrary.search_books("dune", 5).await),
        ("openlibrary.get_book_by_isbn", openlibrary.get_book_by_isbn("9780441013593").await),
        ("openlibrary.get_author", openlibrary.get_author("OL79034A").await),
        ("openlibrary.get_subjects", openlibrary.get_subjects("science_fiction", 5).await),
        ("nasa.get_apod", nasa.get_apod(None, None).await),
        ("nasa.get_mars_photos", nasa.get_mars_photos(1000, "curiosity", None).await),
        ("nasa.get_earth_imagery", nasa.get_earth_imagery(29.78, -95.33, None, 0.1).await),
        ("nasa.get_neo", nasa.get_neo(None, None).await),
        ("news.get_top_headlines", news.get_top_headlines("us", None, None, 5).await),
        ("news.search_everything", news.search_everything("rust", None, None, "en", "publishedAt", 5).await),
        ("news.get_sources", news.get_sources(None, "en", None).await),
        ("youtube.search_videos", youtube.search_videos("rust", 5, "relevance", "moderate", None).await),
        ("youtube.get_channel_statistics", youtube.get_channel_statistics("UC123").await),
        ("youtube.get_playlist_items", youtube.get_playlist_items("PL123", 5).await),
        ("finance.get_daily_time_series", finance.get_daily_time_series("IBM", OutputSize::Compact).await),
        ("finance.get_fx_rate", finance.get_fx_rate("USD", "EUR").await),
        ("finance.get_crypto_quote", finance.get_crypto_quote("BTC", "USD").await),
        ("fec.search_candidates", fec.search_candidates(&CandidateSearch::name("Smith")).await),
        ("fec.get_candidate_totals", fec.get_candidate_totals("P00000001", Some(2024)).await),
        ("fec.get_committee_info", fec.get_committee_info("C00000001").await),
        ("fec.get_committee_totals", fec.get_committee_totals("C00000001", None).await),
        ("fec.get_disbursements", fec.get_disbursements(&DisbursementRequest::new("C00000001")).await),
        ("fec.search_individual_contributions", fec.search_individual_contributions(&ContributionSearch::contributor("Smith")).await),
        ("mal.search_anime", mal.search_anime("cowboy bebop", 5, None).await),
        ("mal.get_anime_details", mal.get_anime_details(1).await),
        ("mal.get_season_anime", mal.get_season_anime(2024, Season::Spring, 5).await),
    ];

    for (operation, outcome) in outcomes {
        match outcome {
            Ok(record) => assert!(
                is_error_record(&record),
                "{} should return only an error key, got {:?}",
                operation,
                record
            ),
            Err(e) => panic!("{} should not raise, got {}", operation, e),
        }
    }

    for provider in ArchiveProvider::ALL {
        let record = archives.get_archive(url, provider, false).await;
        assert!(is_error_record(&record), "multi_archive.get_archive({})", provider);
    }
    let record = archives.get_archive(url, ArchiveProvider::ArchiveIs, true).await;
    assert!(is_error_record(&record), "multi_archive.get_archive(archiveis, capture)");
    let all = archives.get_all_archives(url).await;
    assert!(all.values().all(|record| is_error_record(record)));

    // Judiciary answers with offline placeholders and performs no I/O
    let before = mock.requests().len();
    let judiciary_client = client("judiciary");
    let judiciary = judiciary_client.as_judiciary().unwrap();
    for record in [
        judiciary.search_judges(Some("Smith"), None, None).unwrap(),
        judiciary.get_judge_disclosures("Smith", 2022).unwrap(),
        judiciary.get_asset_details("Smith", 2022).unwrap(),
    ] {
        assert!(!is_error_record(&record));
    }
    assert_eq!(mock.requests().len(), before);
}

#[test]
fn test_sort_by_is_lenient() {
    assert_eq!(SortBy::from("date"), SortBy::Date);
    assert_eq!(SortBy::from("DATE"), SortBy::Date);
    assert_eq!(SortBy::from("relevance"), SortBy::Relevance);
    assert_eq!(SortBy::from("citations"), SortBy::Relevance);
}

#[test]
fn test_record_mapping_round_trip() {
    let snapshot = Snapshot {
        url: "https://example.com".to_string(),
        timestamp: chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap(),
        status_code: Some(200),
        original_url: "https://example.com".to_string(),
        archive_url: "https://web.archive.org/web/20240102030405/https://example.com".to_string(),
    };

    let result = ArchiveResult::from_snapshot(snapshot.clone());
    let mapping = result.to_mapping();
    assert_eq!(mapping["success"], true);
    assert_eq!(mapping["snapshot"]["timestamp"], "2024-01-02T03:04:05");
    assert_eq!(ArchiveResult::from_mapping(mapping).unwrap(), result);

    assert_eq!(Snapshot::from_mapping(snapshot.to_mapping()).unwrap(), snapshot);
}

#[test]
fn test_from_mapping_rejects_wrong_shape() {
    let err = ArxivPaper::from_mapping(error_record("boom")).unwrap_err();
    assert!(matches!(err, ClientError::Parse(_)));
}

#[tokio::test]
async fn test_all_archives_isolate_failures() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_json(
        "https://archive.org/wayback/available",
        200,
        json!({ "url": "example.com", "archived_snapshots": {} }),
    );
    mock.fail(
        "https://archive.is/",
        TransportError::Timeout(std::time::Duration::from_secs(10)),
    );
    mock.respond("https://12ft.io/", HttpResponse::new(302, ""));

    let client = factory(mock).create_client("multi_archive", ClientOptions::new()).unwrap();
    let results = client
        .as_multi_archive()
        .unwrap()
        .get_all_archives("https://example.com")
        .await;

    assert_eq!(results.len(), 4);
    assert!(is_error_record(&results[&ArchiveProvider::Wayback]));
    assert!(is_error_record(&results[&ArchiveProvider::ArchiveIs]));
    assert!(is_error_record(&results[&ArchiveProvider::Memento]));

    let twelve_ft = &results[&ArchiveProvider::TwelveFt];
    assert_eq!(twelve_ft["success"], true);
    assert!(twelve_ft["archive_url"].as_str().unwrap().starts_with("https://12ft.io/"));
}

#[tokio::test]
async fn test_latest_snapshot_absent() {
    let mock = Arc::new(MockTransport::new());
    mock.respond_json(
        "https://archive.org/wayback/available",
        200,
        json!({ "url": "never-archived.example", "archived_snapshots": {} }),
    );

    let client = factory(mock).create_client("wayback", ClientOptions::new()).unwrap();
    let snapshot = client
        .as_archive()
        .unwrap()
        .get_latest_snapshot("never-archived.example")
        .await
        .unwrap();
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn test_semantic_scholar_over_http() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/paper/search")
        .match_query(Matcher::UrlEncoded("query".into(), "transformers".into()))
        .match_header("x-api-key", "s2-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "total": 1,
                "data": [{
                    "paperId": "abc123",
                    "title": "Attention Is All You Need",
                    "authors": [{ "name": "Ashish Vaswani" }],
                    "year": 2017,
                    "externalIds": { "DOI": "10.48550/arXiv.1706.03762" },
                    "citationCount": 100000
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let factory = ClientFactory::new(Config::default());
    let client = factory
        .create_client(
            "semantic_scholar",
            ClientOptions::new().base_url(server.url()).api_key("s2-key"),
        )
        .unwrap();
    let papers = client
        .as_semantic_scholar()
        .unwrap()
        .search("transformers", 10, None)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(papers.len(), 1);
    assert_eq!(papers[0].doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
    assert_eq!(papers[0].year, Some(2017));
}

#[tokio::test]
async fn test_wikipedia_server_error_over_http() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", Matcher::Any)
        .with_status(500)
        .with_body("upstream failure")
        .create_async()
        .await;

    let factory = ClientFactory::new(Config::default());
    let client = factory
        .create_client("wikipedia", ClientOptions::new().base_url(server.url()))
        .unwrap();
    let result = client
        .as_wikipedia()
        .unwrap()
        .get_summary("Rust (programming language)")
        .await
        .unwrap();

    assert!(is_error_record(&result));
    assert!(result["error"].as_str().unwrap().contains("500"));
}

#[test]
fn test_response_cache_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResponseCache::new(dir.path(), true);
    let record = json!({ "records": [{ "NAME": "Alabama" }] })
        .as_object()
        .cloned()
        .unwrap();

    assert!(cache.get("acs 2022/state").is_none());
    cache.put("acs 2022/state", &record);
    assert_eq!(cache.get("acs 2022/state"), Some(record));
    assert_eq!(cache.len(), 1);

    assert_eq!(cache.clear(None), 1);
    assert!(cache.is_empty());
}

#[test]
fn test_config_file_feeds_factory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("research-clients.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        r#"
[api_keys]
wolfram = "APP-FROM-FILE"

[http]
timeout_secs = 7

[cache]
enabled = false
"#
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.api_keys.get("wolfram"), Some("APP-FROM-FILE"));
    assert_eq!(config.timeout(), std::time::Duration::from_secs(7));
    assert!(!config.cache.enabled);

    let factory = ClientFactory::new(config).with_transport(Arc::new(MockTransport::new()));
    assert!(factory.create_client("wolfram", ClientOptions::new()).is_ok());
}
