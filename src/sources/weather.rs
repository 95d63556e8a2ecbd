//! NOAA National Weather Service source (api.weather.gov). No key required.

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::transport::Method;
use crate::utils::{into_record, map_array, pick, pick_str};

const NWS_API_BASE: &str = "https://api.weather.gov";
const USER_AGENT: &str = "research-clients-weather/1.0";

/// NWS client.
///
/// Forecasts take two requests: the `/points` lookup resolves a coordinate to
/// its forecast office grid, whose forecast URL is then fetched.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    endpoint: Endpoint,
}

impl WeatherClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let endpoint = options
            .endpoint(NWS_API_BASE, Duration::from_secs(30))?
            .with_header("User-Agent", USER_AGENT)
            .with_header("Accept", "application/geo+json");
        Ok(Self { endpoint })
    }

    /// Resolve a coordinate and fetch its forecast; returns (points, forecast)
    async fn point_forecast(&self, latitude: f64, longitude: f64) -> Result<(Value, Value), ClientError> {
        let points = self
            .endpoint
            .fetch_json(&self.endpoint.get(&format!("/points/{},{}", latitude, longitude)))
            .await?;

        let forecast_url = pick_str(&points, "/properties/forecast").ok_or_else(|| {
            ClientError::Parse("Could not get forecast URL for location".to_string())
        })?;
        tracing::debug!("Forecast URL for {},{}: {}", latitude, longitude, forecast_url);

        let forecast = self
            .endpoint
            .fetch_json(&self.endpoint.request(Method::Get, forecast_url))
            .await?;
        Ok((points, forecast))
    }

    /// Conditions for the first forecast period at a coordinate
    pub async fn get_current_weather(&self, latitude: f64, longitude: f64) -> Result<Record, ClientError> {
        tracing::info!("Fetching current weather for {},{}", latitude, longitude);

        let outcome = self
            .point_forecast(latitude, longitude)
            .await
            .and_then(|(points, forecast)| {
                let Some(current) = forecast.pointer("/properties/periods/0") else {
                    return Ok(error_record("No forecast data available"));
                };
                into_record(json!({
                    "location": {
                        "latitude": latitude,
                        "longitude": longitude,
                        "city": pick(&points, "/properties/relativeLocation/properties/city"),
                        "state": pick(&points, "/properties/relativeLocation/properties/state"),
                    },
                    "current": {
                        "name": pick(current, "/name"),
                        "temperature": pick(current, "/temperature"),
                        "temperature_unit": pick(current, "/temperatureUnit"),
                        "wind_speed": pick(current, "/windSpeed"),
                        "wind_direction": pick(current, "/windDirection"),
                        "short_forecast": pick(current, "/shortForecast"),
                        "detailed_forecast": pick(current, "/detailedForecast"),
                    },
                }))
            });

        sentinel("weather", "get_current_weather", outcome)
    }

    /// The next `periods` forecast periods (day and night halves)
    pub async fn get_forecast(&self, latitude: f64, longitude: f64, periods: usize) -> Result<Record, ClientError> {
        tracing::info!("Fetching {}-period forecast for {},{}", periods, latitude, longitude);

        let outcome = self
            .point_forecast(latitude, longitude)
            .await
            .and_then(|(_, forecast)| {
                let forecast_periods: Vec<Value> = forecast
                    .pointer("/properties/periods")
                    .and_then(Value::as_array)
                    .map(|all| all.iter().take(periods).map(period_summary).collect())
                    .unwrap_or_default();

                into_record(json!({
                    "location": { "latitude": latitude, "longitude": longitude },
                    "forecast": forecast_periods,
                }))
            });

        sentinel("weather", "get_forecast", outcome)
    }

    /// Active alerts for a two-letter state code
    pub async fn get_alerts(&self, state: &str) -> Result<Record, ClientError> {
        let state = state.trim().to_uppercase();
        tracing::info!("Fetching weather alerts for {}", state);

        let request = self.endpoint.get(&format!("/alerts/active/area/{}", state));
        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let alerts = map_array(&data, "/features", |feature| json!({
                "event": pick(feature, "/properties/event"),
                "headline": pick(feature, "/properties/headline"),
                "severity": pick(feature, "/properties/severity"),
                "urgency": pick(feature, "/properties/urgency"),
                "areas": pick(feature, "/properties/areaDesc"),
                "effective": pick(feature, "/properties/effective"),
                "expires": pick(feature, "/properties/expires"),
                "description": pick(feature, "/properties/description"),
            }));
            into_record(json!({
                "state": state,
                "count": alerts.as_array().map_or(0, Vec::len),
                "alerts": alerts,
            }))
        });

        sentinel("weather", "get_alerts", outcome)
    }
}

fn period_summary(period: &Value) -> Value {
    json!({
        "name": pick(period, "/name"),
        "temperature": pick(period, "/temperature"),
        "temperature_unit": pick(period, "/temperatureUnit"),
        "wind_speed": pick(period, "/windSpeed"),
        "wind_direction": pick(period, "/windDirection"),
        "icon": pick(period, "/icon"),
        "short_forecast": pick(period, "/shortForecast"),
        "detailed_forecast": pick(period, "/detailedForecast"),
    })
}

impl Adapter for WeatherClient {
    fn id(&self) -> &'static str {
        "weather"
    }

    fn name(&self) -> &'static str {
        "NOAA Weather"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::is_error_record;
    use crate::transport::{HttpResponse, MockTransport};
    use std::sync::Arc;

    fn client(mock: Arc<MockTransport>) -> WeatherClient {
        WeatherClient::new(ClientOptions::new().transport(mock)).unwrap()
    }

    fn mock_with_forecast(periods: Value) -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://api.weather.gov/points/",
            200,
            json!({
                "properties": {
                    "forecast": "https://api.weather.gov/gridpoints/MTR/85,105/forecast",
                    "relativeLocation": { "properties": { "city": "San Francisco", "state": "CA" } }
                }
            }),
        );
        mock.respond_json(
            "https://api.weather.gov/gridpoints/",
            200,
            json!({ "properties": { "periods": periods } }),
        );
        mock
    }

    fn period(name: &str, temperature: i64) -> Value {
        json!({
            "name": name,
            "temperature": temperature,
            "temperatureUnit": "F",
            "windSpeed": "10 mph",
            "windDirection": "W",
            "shortForecast": "Sunny"
        })
    }

    #[tokio::test]
    async fn test_current_weather_follows_forecast_url() {
        let mock = mock_with_forecast(json!([period("Tonight", 54), period("Tuesday", 66)]));

        let result = client(mock.clone())
            .get_current_weather(37.77, -122.42)
            .await
            .unwrap();

        assert_eq!(result["location"]["city"], "San Francisco");
        assert_eq!(result["current"]["name"], "Tonight");
        assert_eq!(result["current"]["temperature"], 54);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://api.weather.gov/points/37.77,-122.42");
        assert_eq!(
            requests[1].url,
            "https://api.weather.gov/gridpoints/MTR/85,105/forecast"
        );
        assert_eq!(requests[1].header_value("accept"), Some("application/geo+json"));
    }

    #[tokio::test]
    async fn test_forecast_truncates_periods() {
        let mock = mock_with_forecast(json!([period("A", 1), period("B", 2), period("C", 3)]));

        let result = client(mock).get_forecast(37.77, -122.42, 2).await.unwrap();
        let forecast = result["forecast"].as_array().unwrap();
        assert_eq!(forecast.len(), 2);
        assert_eq!(forecast[1]["name"], "B");
        assert_eq!(forecast[1]["icon"], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_periods() {
        let mock = mock_with_forecast(json!([]));
        let result = client(mock).get_current_weather(1.0, 2.0).await.unwrap();
        assert_eq!(result, error_record("No forecast data available"));
    }

    #[tokio::test]
    async fn test_location_outside_coverage() {
        let mock = Arc::new(MockTransport::new());
        mock.respond(
            "https://api.weather.gov/points/",
            HttpResponse::new(404, r#"{"title":"Data Unavailable For Requested Point"}"#),
        );

        let result = client(mock.clone()).get_forecast(48.85, 2.35, 7).await.unwrap();
        assert!(is_error_record(&result));
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_alerts() {
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            "https://api.weather.gov/alerts/active/area/CA",
            200,
            json!({
                "features": [{
                    "properties": {
                        "event": "Heat Advisory",
                        "severity": "Moderate",
                        "areaDesc": "Sacramento Valley"
                    }
                }]
            }),
        );

        let result = client(mock).get_alerts("ca").await.unwrap();
        assert_eq!(result["state"], "CA");
        assert_eq!(result["count"], 1);
        assert_eq!(result["alerts"][0]["areas"], "Sacramento Valley");
    }
}
