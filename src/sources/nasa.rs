//! NASA open APIs: APOD, Mars rover photos, Earth imagery and near-Earth objects.

use chrono::{Duration as DateSpan, Local, NaiveDate};
use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities,
};
use crate::utils::{into_record, map_array, pick};

const NASA_API_BASE: &str = "https://api.nasa.gov";

/// Shared key NASA hands out for low-volume use
pub const DEMO_KEY: &str = "DEMO_KEY";

/// Default width and height of an Earth imagery tile, in degrees
pub const DEFAULT_IMAGERY_DIM: f64 = 0.025;

/// Days covered by a NEO feed when no end date is given
const NEO_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct NasaClient {
    endpoint: Endpoint,
    api_key: String,
}

impl NasaClient {
    /// Falls back to [`DEMO_KEY`] when no key is configured
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let api_key = options.key().unwrap_or(DEMO_KEY).to_string();
        if api_key == DEMO_KEY {
            tracing::debug!("Using NASA DEMO_KEY; requests are heavily rate limited");
        }
        let endpoint = options.endpoint(NASA_API_BASE, Duration::from_secs(30))?;
        Ok(Self { endpoint, api_key })
    }

    /// Astronomy Picture of the Day.
    ///
    /// With `count`, returns that many random pictures and `date` is ignored.
    pub async fn get_apod(&self, date: Option<NaiveDate>, count: Option<u32>) -> Result<Record, ClientError> {
        let mut request = self
            .endpoint
            .get("/planetary/apod")
            .query("api_key", &self.api_key);
        request = match (count, date) {
            (Some(count), _) => request.query("count", count),
            (None, Some(date)) => request.query("date", date.format("%Y-%m-%d")),
            (None, None) => request,
        };

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| match data {
            Value::Array(apods) => into_record(json!({
                "count": apods.len(),
                "apods": apods,
            })),
            data => into_record(json!({
                "date": pick(&data, "/date"),
                "title": pick(&data, "/title"),
                "explanation": pick(&data, "/explanation"),
                "url": pick(&data, "/url"),
                "hdurl": pick(&data, "/hdurl"),
                "media_type": pick(&data, "/media_type"),
                "copyright": pick(&data, "/copyright"),
            })),
        });

        sentinel("nasa", "get_apod", outcome)
    }

    /// Photos a rover took on a given sol; `camera` is e.g. `FHAZ` or `MAST`
    pub async fn get_mars_photos(&self, sol: u32, rover: &str, camera: Option<&str>) -> Result<Record, ClientError> {
        tracing::info!("Fetching {} photos for sol {}", rover, sol);

        let request = self
            .endpoint
            .get(&format!("/mars-photos/api/v1/rovers/{}/photos", rover))
            .query("sol", sol)
            .query("api_key", &self.api_key)
            .query_opt("camera", camera);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let photos = map_array(&data, "/photos", |photo| json!({
                "id": pick(photo, "/id"),
                "sol": pick(photo, "/sol"),
                "camera": pick(photo, "/camera/name"),
                "img_src": pick(photo, "/img_src"),
                "earth_date": pick(photo, "/earth_date"),
                "rover": pick(photo, "/rover/name"),
            }));
            into_record(json!({
                "rover": rover,
                "sol": sol,
                "count": photos.as_array().map_or(0, Vec::len),
                "photos": photos,
            }))
        });

        sentinel("nasa", "get_mars_photos", outcome)
    }

    /// Landsat imagery around a coordinate
    pub async fn get_earth_imagery(
        &self,
        lat: f64,
        lon: f64,
        date: Option<NaiveDate>,
        dim: f64,
    ) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get("/planetary/earth/imagery")
            .query("lat", lat)
            .query("lon", lon)
            .query("dim", dim)
            .query("api_key", &self.api_key)
            .query_opt("date", date.map(|d| d.format("%Y-%m-%d")));

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "date": pick(&data, "/date"),
                "url": pick(&data, "/url"),
                "cloud_score": pick(&data, "/cloud_score"),
                "location": { "latitude": lat, "longitude": lon },
            }))
        });

        sentinel("nasa", "get_earth_imagery", outcome)
    }

    /// Near-Earth objects approaching between two dates; defaults to the next week
    pub async fn get_neo(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Record, ClientError> {
        let start = start.unwrap_or_else(|| Local::now().date_naive());
        let end = end.unwrap_or_else(|| start + DateSpan::days(NEO_WINDOW_DAYS));
        let (start_date, end_date) = (start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string());
        tracing::info!("Fetching near-Earth objects {} to {}", start_date, end_date);

        let request = self
            .endpoint
            .get("/neo/rest/v1/feed")
            .query("start_date", &start_date)
            .query("end_date", &end_date)
            .query("api_key", &self.api_key);

        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            into_record(json!({
                "element_count": data.get("element_count").cloned().unwrap_or(json!(0)),
                "near_earth_objects": data.get("near_earth_objects").cloned().unwrap_or(json!({})),
                "start_date": start_date,
                "end_date": end_date,
            }))
        });

        sentinel("nasa", "get_neo", outcome)
    }
}

impl Adapter for NasaClient {
    fn id(&self) -> &'static str {
        "nasa"
    }

    fn name(&self) -> &'static str {
        "NASA"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP
    }
}
