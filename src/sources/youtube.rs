//! YouTube Data API v3 source.

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::transport::HttpRequest;
use crate::utils::{into_record, map_array, pick};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Page size ceiling for list endpoints
pub const MAX_RESULTS: usize = 50;

/// YouTube client; the key is mandatory
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    endpoint: Endpoint,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let api_key = options.required_key("YouTube", "YOUTUBE_API_KEY")?;
        let endpoint = options.endpoint(YOUTUBE_API_BASE, Duration::from_secs(30))?;
        Ok(Self { endpoint, api_key })
    }

    fn api_request(&self, path: &str) -> HttpRequest {
        self.endpoint.get(path).query("key", &self.api_key)
    }

    /// Search videos.
    ///
    /// `order` is e.g. `relevance`, `viewCount` or `date`; `safe_search` is
    /// `none`, `moderate` or `strict`; `video_duration` is `short`, `medium` or `long`.
    pub async fn search_videos(
        &self,
        query: &str,
        max_results: usize,
        order: &str,
        safe_search: &str,
        video_duration: Option<&str>,
    ) -> Result<Record, ClientError> {
        tracing::info!("Searching YouTube: {}", query);

        let request = self
            .api_request("/search")
            .query("part", "snippet")
            .query("type", "video")
            .query("q", query)
            .query("maxResults", max_results.clamp(1, MAX_RESULTS))
            .query("order", order)
            .query("safeSearch", safe_search)
            .query_opt("videoDuration", video_duration);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let videos = map_array(&data, "/items", |item| json!({
                "video_id": pick(item, "/id/videoId"),
                "title": pick(item, "/snippet/title"),
                "description": pick(item, "/snippet/description"),
                "channel_title": pick(item, "/snippet/channelTitle"),
                "channel_id": pick(item, "/snippet/channelId"),
                "publish_time": pick(item, "/snippet/publishTime"),
                "thumbnails": thumbnails(item),
            }));
            into_record(json!({
                "query": query,
                "total_results": videos.as_array().map_or(0, Vec::len),
                "videos": videos,
                "next_page_token": pick(&data, "/nextPageToken"),
            }))
        });

        sentinel("youtube", "search_videos", outcome)
    }

    /// Snippet, statistics and branding for one channel
    pub async fn get_channel_statistics(&self, channel_id: &str) -> Result<Record, ClientError> {
        tracing::info!("Fetching YouTube channel {}", channel_id);

        let request = self
            .api_request("/channels")
            .query("part", "snippet,statistics,brandingSettings")
            .query("id", channel_id);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let Some(item) = data.pointer("/items/0") else {
                return Ok(error_record(format!("Channel {} not found", channel_id)));
            };

            let hidden = item
                .pointer("/statistics/hiddenSubscriberCount")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let subscribers = if hidden {
                Value::Null
            } else {
                json!(count(item, "/statistics/subscriberCount"))
            };

            into_record(json!({
                "channel_id": channel_id,
                "title": pick(item, "/snippet/title"),
                "description": pick(item, "/snippet/description"),
                "published_at": pick(item, "/snippet/publishedAt"),
                "custom_url": pick(item, "/snippet/customUrl"),
                "thumbnails": thumbnails(item),
                "country": pick(item, "/snippet/country"),
                "view_count": count(item, "/statistics/viewCount"),
                "subscriber_count": subscribers,
                "video_count": count(item, "/statistics/videoCount"),
                "keywords": pick(item, "/brandingSettings/channel/keywords"),
            }))
        });

        sentinel("youtube", "get_channel_statistics", outcome)
    }

    /// Videos of a playlist, such as a channel's uploads list
    pub async fn get_playlist_items(&self, playlist_id: &str, max_results: usize) -> Result<Record, ClientError> {
        let request = self
            .api_request("/playlistItems")
            .query("part", "snippet,contentDetails")
            .query("playlistId", playlist_id)
            .query("maxResults", max_results.clamp(1, MAX_RESULTS));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let items = map_array(&data, "/items", |item| json!({
                "video_id": pick(item, "/contentDetails/videoId"),
                "title": pick(item, "/snippet/title"),
                "description": pick(item, "/snippet/description"),
                "published_at": pick(item, "/snippet/publishedAt"),
                "position": pick(item, "/snippet/position"),
                "thumbnails": thumbnails(item),
            }));
            into_record(json!({
                "playlist_id": playlist_id,
                "total_results": items.as_array().map_or(0, Vec::len),
                "items": items,
                "next_page_token": pick(&data, "/nextPageToken"),
            }))
        });

        sentinel("youtube", "get_playlist_items", outcome)
    }
}

fn thumbnails(item: &Value) -> Value {
    item.pointer("/snippet/thumbnails")
        .cloned()
        .unwrap_or_else(|| json!({}))
}

/// Statistics arrive as decimal strings
fn count(item: &Value, pointer: &str) -> u64 {
    match item.pointer(pointer) {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

impl Adapter for YouTubeClient {
    fn id(&self) -> &'static str {
        "youtube"
    }

    fn name(&self) -> &'static str {
        "YouTube"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::is_error_record;
    use crate::transport::{HttpResponse, MockTransport};
    use std::sync::Arc;

    fn client(mock: Arc<MockTransport>) -> YouTubeClient {
        YouTubeClient::new(ClientOptions::new().transport(mock).api_key("yt-key")).unwrap()
    }

    #[tokio::test]
    async fn test_search_clamps_max_results() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://www.googleapis.com/youtube/v3/search",
            200,
            json!({
                "nextPageToken": "CAUQAA",
                "items": [{
                    "id": { "kind": "youtube#video", "videoId": "dQw4w9WgXcQ" },
                    "snippet": { "title": "Never Gonna Give You Up", "channelTitle": "Rick Astley" }
                }]
            }),
        );

        let youtube = client(mock.clone());
        let result = youtube
            .search_videos("rick astley", 500, "relevance", "moderate", None)
            .await
            .unwrap();

        assert_eq!(result["total_results"], 1);
        assert_eq!(result["videos"][0]["video_id"], "dQw4w9WgXcQ");
        assert_eq!(result["videos"][0]["thumbnails"], json!({}));
        assert_eq!(result["next_page_token"], "CAUQAA");

        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("maxResults"), Some("50"));
        assert_eq!(request.query_value("key"), Some("yt-key"));

        youtube.search_videos("x", 0, "date", "strict", Some("short")).await.unwrap();
        let request = mock.last_request().unwrap();
        assert_eq!(request.query_value("maxResults"), Some("1"));
        assert_eq!(request.query_value("videoDuration"), Some("short"));
    }

    #[tokio::test]
    async fn test_channel_statistics_parses_counts() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://www.googleapis.com/youtube/v3/channels",
            200,
            json!({
                "items": [{
                    "snippet": { "title": "Rust", "country": "US" },
                    "statistics": {
                        "viewCount": "123456",
                        "subscriberCount": "789",
                        "hiddenSubscriberCount": false,
                        "videoCount": "42"
                    },
                    "brandingSettings": { "channel": { "keywords": "rust programming" } }
                }]
            }),
        );

        let result = client(mock).get_channel_statistics("UC123").await.unwrap();
        assert_eq!(result["view_count"], 123456);
        assert_eq!(result["subscriber_count"], 789);
        assert_eq!(result["video_count"], 42);
        assert_eq!(result["keywords"], "rust programming");
    }

    #[tokio::test]
    async fn test_hidden_subscribers_and_missing_channel() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://www.googleapis.com/youtube/v3/channels",
            200,
            json!({ "items": [{ "statistics": { "subscriberCount": "0", "hiddenSubscriberCount": true } }] }),
        );
        let youtube = client(mock.clone());
        let result = youtube.get_channel_statistics("UChidden").await.unwrap();
        assert_eq!(result["subscriber_count"], Value::Null);

        mock.respond_json(
            "https://www.googleapis.com/youtube/v3/channels",
            200,
            json!({ "items": [] }),
        );
        let result = youtube.get_channel_statistics("UCgone").await.unwrap();
        assert_eq!(result, error_record("Channel UCgone not found"));
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_sentinel() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "https://www.googleapis.com/youtube/v3/",
            HttpResponse::new(403, r#"{"error":{"code":403,"message":"quotaExceeded"}}"#),
        );

        let result = client(mock).get_playlist_items("PL123", 25).await.unwrap();
        assert!(is_error_record(&result));
    }
}
