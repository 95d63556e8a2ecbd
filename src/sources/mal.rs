//! MyAnimeList API v2 source.

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities,
};
use crate::utils::{into_record, map_array, pick};

const MAL_API_BASE: &str = "https://api.myanimelist.net/v2";

const SEARCH_FIELDS: &str = "mean,rank,popularity,num_episodes,genres,studios";
const DETAIL_FIELDS: &str =
    "synopsis,mean,rank,popularity,num_episodes,start_season,genres,studios,rating";
const SEASON_FIELDS: &str = "mean,rank,genres";

/// Broadcast season of the anime calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "winter" => Ok(Season::Winter),
            "spring" => Ok(Season::Spring),
            "summer" => Ok(Season::Summer),
            "fall" | "autumn" => Ok(Season::Fall),
            other => Err(ClientError::Configuration(format!(
                "Unknown season: {}. Use: winter, spring, summer, fall",
                other
            ))),
        }
    }
}

/// MyAnimeList client; the client ID is mandatory and sent as `X-MAL-CLIENT-ID`
#[derive(Debug, Clone)]
pub struct MalClient {
    endpoint: Endpoint,
}

impl MalClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let client_id = options.required_key("MyAnimeList", "MAL_API_KEY")?;
        let endpoint = options
            .endpoint(MAL_API_BASE, Duration::from_secs(30))?
            .with_header("X-MAL-CLIENT-ID", client_id);
        Ok(Self { endpoint })
    }

    /// Search anime by title; `fields` overrides the default field list
    pub async fn search_anime(&self, query: &str, limit: usize, fields: Option<&str>) -> Result<Record, ClientError> {
        tracing::info!("Searching MyAnimeList: {}", query);

        let request = self
            .endpoint
            .get("/anime")
            .query("q", query)
            .query("limit", limit)
            .query("fields", fields.unwrap_or(SEARCH_FIELDS));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let anime = map_array(&data, "/data", |item| {
                let node = item.get("node").unwrap_or(&Value::Null);
                json!({
                    "id": pick(node, "/id"),
                    "title": pick(node, "/title"),
                    "mean_score": pick(node, "/mean"),
                    "rank": pick(node, "/rank"),
                    "popularity": pick(node, "/popularity"),
                    "num_episodes": pick(node, "/num_episodes"),
                    "genres": names(node, "/genres"),
                    "studios": names(node, "/studios"),
                })
            });
            into_record(json!({
                "total": anime.as_array().map_or(0, Vec::len),
                "anime": anime,
            }))
        });

        sentinel("mal", "search_anime", outcome)
    }

    pub async fn get_anime_details(&self, anime_id: u64) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get(&format!("/anime/{}", anime_id))
            .query("fields", DETAIL_FIELDS);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "id": pick(&data, "/id"),
                "title": pick(&data, "/title"),
                "synopsis": pick(&data, "/synopsis"),
                "mean_score": pick(&data, "/mean"),
                "rank": pick(&data, "/rank"),
                "popularity": pick(&data, "/popularity"),
                "num_episodes": pick(&data, "/num_episodes"),
                "start_season": pick(&data, "/start_season"),
                "genres": names(&data, "/genres"),
                "studios": names(&data, "/studios"),
                "rating": pick(&data, "/rating"),
            }))
        });

        sentinel("mal", "get_anime_details", outcome)
    }

    /// Anime airing in a given season
    pub async fn get_season_anime(&self, year: u16, season: Season, limit: usize) -> Result<Record, ClientError> {
        tracing::info!("Fetching {} {} anime", season, year);

        let request = self
            .endpoint
            .get(&format!("/anime/season/{}/{}", year, season))
            .query("limit", limit)
            .query("fields", SEASON_FIELDS);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "season": format!("{} {}", season, year),
                "anime": map_array(&data, "/data", |item| json!({
                    "id": pick(item, "/node/id"),
                    "title": pick(item, "/node/title"),
                    "mean_score": pick(item, "/node/mean"),
                    "genres": names(item.get("node").unwrap_or(&Value::Null), "/genres"),
                })),
            }))
        });

        sentinel("mal", "get_season_anime", outcome)
    }
}

/// `[{"id": .., "name": ..}]` to `["name", ..]`
fn names(value: &Value, pointer: &str) -> Value {
    map_array(value, pointer, |entry| pick(entry, "/name"))
}

impl Adapter for MalClient {
    fn id(&self) -> &'static str {
        "mal"
    }

    fn name(&self) -> &'static str {
        "MyAnimeList"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}
