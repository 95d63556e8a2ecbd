use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use research_clients::config::{find_config_file, load_config, Config};
use research_clients::models::{
    ArxivPaper, PubMedArticle, Record, ResultRecord, ScholarPaper, SortBy,
};
use research_clients::sources::{
    is_error_record, ArchiveProvider, Client, ClientFactory, ClientOptions, SOURCES, DEFAULT_RETRY_DELAY,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Query academic, government, media and web-archive data sources
#[derive(Parser, Debug)]
#[command(name = "research-clients")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query research and public data APIs through one registry", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Sort order for literature searches
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    Relevance,
    Date,
}

impl From<SortField> for SortBy {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Relevance => SortBy::Relevance,
            SortField::Date => SortBy::Date,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every registered source
    Sources,

    /// Search a literature source (arxiv, semantic_scholar, pubmed)
    #[command(alias = "s")]
    Search {
        /// Source name or alias
        source: String,

        /// Search query string
        query: String,

        /// Maximum number of results
        #[arg(long, short, default_value_t = 10)]
        max_results: usize,

        #[arg(long, value_enum, default_value_t = SortField::Relevance)]
        sort_by: SortField,
    },

    /// Look up one item by identifier
    ///
    /// arxiv: arXiv ID; semantic_scholar: DOI; pubmed: PMID;
    /// wikipedia: article title; openlibrary: ISBN
    #[command(alias = "l")]
    Lookup {
        /// Source name or alias
        source: String,

        /// Identifier understood by the source
        id: String,
    },

    /// Find or create archived copies of a URL
    Archive {
        url: String,

        /// Single provider (wayback, archiveis, memento, 12ft); all when omitted
        #[arg(long, short)]
        provider: Option<String>,

        /// Request a new capture when none exists
        #[arg(long)]
        capture: bool,
    },

    /// Ask Wolfram|Alpha
    Wolfram {
        query: String,

        /// Return every result pod instead of the short answer
        #[arg(long)]
        full: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("research_clients={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match cli.config.clone().or_else(find_config_file) {
        Some(path) => {
            tracing::info!("Using config file: {}", path.display());
            load_config(&path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::from_env(),
    };
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }

    let factory = ClientFactory::new(config);

    match cli.command {
        Commands::Sources => print_sources(cli.json)?,

        Commands::Search {
            source,
            query,
            max_results,
            sort_by,
        } => {
            let client = factory.create_client(&source, ClientOptions::new())?;
            let rows = match &client {
                Client::Arxiv(arxiv) => arxiv
                    .search(&query, max_results, SortBy::from(sort_by))
                    .await?
                    .iter()
                    .map(PaperRow::from_arxiv)
                    .collect::<Vec<_>>(),
                Client::SemanticScholar(scholar) => scholar
                    .search(&query, max_results, None)
                    .await?
                    .iter()
                    .map(PaperRow::from_scholar)
                    .collect(),
                Client::PubMed(pubmed) => pubmed
                    .search(&query, max_results, SortBy::from(sort_by))
                    .await?
                    .iter()
                    .map(PaperRow::from_pubmed)
                    .collect(),
                other => bail!(
                    "{} is not a literature source; use arxiv, semantic_scholar or pubmed",
                    other.adapter().id()
                ),
            };
            eprintln!("Found {} results", rows.len());
            output_rows(&rows, cli.json)?;
        }

        Commands::Lookup { source, id } => {
            let client = factory.create_client(&source, ClientOptions::new())?;
            let found: Option<Record> = match &client {
                Client::Arxiv(arxiv) => arxiv.get_by_id(&id).await?.map(|p| p.to_mapping()),
                Client::SemanticScholar(scholar) => {
                    scholar.get_by_doi(&id, None).await?.map(|p| p.to_mapping())
                }
                Client::PubMed(pubmed) => pubmed.get_by_id(&id).await?.map(|a| a.to_mapping()),
                Client::Wikipedia(wikipedia) => Some(wikipedia.get_summary(&id).await?),
                Client::OpenLibrary(openlibrary) => Some(openlibrary.get_book_by_isbn(&id).await?),
                other => bail!("Lookup is not available for {}", other.adapter().id()),
            };

            match found {
                Some(record) => print_json(&record)?,
                None => {
                    eprintln!("Not found: {}", id);
                    std::process::exit(1);
                }
            }
        }

        Commands::Archive {
            url,
            provider,
            capture,
        } => {
            let client = factory.create_client("multi_archive", ClientOptions::new())?;
            let Some(archives) = client.as_multi_archive() else {
                bail!("multi_archive source is unavailable");
            };

            match provider {
                Some(name) => {
                    let provider: ArchiveProvider = name.parse()?;
                    let result = if provider == ArchiveProvider::Wayback && capture {
                        let wayback = factory.create_client("archive", ClientOptions::new())?;
                        match wayback.as_archive() {
                            Some(wayback) => wayback.archive_url(&url, true, DEFAULT_RETRY_DELAY).await?.to_mapping(),
                            None => bail!("archive source is unavailable"),
                        }
                    } else {
                        archives.get_archive(&url, provider, capture).await
                    };
                    output_archives(&[(provider, result)], cli.json)?;
                }
                None => {
                    let results: Vec<_> = archives.get_all_archives(&url).await.into_iter().collect();
                    output_archives(&results, cli.json)?;
                }
            }
        }

        Commands::Wolfram { query, full } => {
            let client = factory.create_client("wolfram", ClientOptions::new())?;
            let Some(wolfram) = client.as_wolfram() else {
                bail!("wolfram source is unavailable");
            };

            let result = if full {
                wolfram.query_full(&query).await?
            } else {
                wolfram.query(&query).await?
            };

            if cli.json {
                print_json(&result.to_mapping())?;
            } else if !result.success {
                bail!("{}", result.error.unwrap_or_default());
            } else if let Some(pods) = &result.pods {
                for pod in pods {
                    println!("{}", pod.title.as_deref().unwrap_or("(untitled)"));
                    for subpod in &pod.subpods {
                        println!("  {}", subpod.plaintext);
                    }
                }
            } else {
                println!("{}", result.result.unwrap_or_default());
            }
        }
    }

    Ok(())
}

/// Uniform row for literature results
#[derive(Debug)]
struct PaperRow {
    title: String,
    authors: String,
    year: String,
    id: String,
    mapping: Record,
}

impl PaperRow {
    fn from_arxiv(paper: &ArxivPaper) -> Self {
        Self {
            title: paper.title.clone(),
            authors: paper.authors.join(", "),
            year: paper.published.format("%Y").to_string(),
            id: paper.arxiv_id.clone(),
            mapping: paper.to_mapping(),
        }
    }

    fn from_scholar(paper: &ScholarPaper) -> Self {
        Self {
            title: paper.title.clone(),
            authors: paper.authors.join(", "),
            year: paper.year.map(|y| y.to_string()).unwrap_or_default(),
            id: paper
                .doi
                .clone()
                .or_else(|| paper.paper_id.clone())
                .unwrap_or_default(),
            mapping: paper.to_mapping(),
        }
    }

    fn from_pubmed(article: &PubMedArticle) -> Self {
        Self {
            title: article.title.clone(),
            authors: article.authors.join(", "),
            year: article.publication_date.chars().take(4).collect(),
            id: article.pmid.clone(),
            mapping: article.to_mapping(),
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max - 3).collect::<String>())
    } else {
        text.to_string()
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_sources(json: bool) -> Result<()> {
    if json {
        let listing: Vec<_> = SOURCES
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "name": entry.name,
                    "aliases": entry.aliases,
                    "description": entry.description,
                    "error_mode": entry.error_mode,
                    "key_variables": entry.key_variables,
                })
            })
            .collect();
        return print_json(&listing);
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Source", "Aliases", "Errors", "Key", "Description"]);
    for entry in SOURCES.iter() {
        table.add_row(vec![
            Cell::new(entry.name).add_attribute(Attribute::Bold),
            Cell::new(entry.aliases.join(", ")),
            Cell::new(entry.error_mode.to_string()),
            Cell::new(entry.key_variables.first().copied().unwrap_or("-")),
            Cell::new(entry.description),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn output_rows(rows: &[PaperRow], json: bool) -> Result<()> {
    if json {
        let mappings: Vec<&Record> = rows.iter().map(|row| &row.mapping).collect();
        return print_json(&mappings);
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Title", "Authors", "Year", "ID"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(truncate(&row.title, 60)).add_attribute(Attribute::Bold),
            Cell::new(truncate(&row.authors, 30)),
            Cell::new(&row.year),
            Cell::new(&row.id),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn output_archives(results: &[(ArchiveProvider, Record)], json: bool) -> Result<()> {
    if json {
        let mut listing = Record::new();
        for (provider, result) in results {
            listing.insert(provider.to_string(), serde_json::Value::Object(result.clone()));
        }
        return print_json(&listing);
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Provider", "Status", "Archive URL / Error"]);
    for (provider, result) in results {
        let (status, key) = if is_error_record(result) {
            ("failed", "error")
        } else {
            ("ok", "archive_url")
        };
        let detail = result.get(key).and_then(|v| v.as_str()).unwrap_or_default();
        table.add_row(vec![
            Cell::new(provider.to_string()).add_attribute(Attribute::Bold),
            Cell::new(status),
            Cell::new(detail),
        ]);
    }
    println!("{table}");
    Ok(())
}
