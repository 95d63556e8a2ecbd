//! Alpha Vantage market data: equities, FX and crypto.

use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::utils::{into_record, pick};

const ALPHA_VANTAGE_BASE: &str = "https://www.alphavantage.co/query";

/// Size of a daily time series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputSize {
    /// Latest 100 data points
    #[default]
    Compact,
    /// Full history
    Full,
}

impl OutputSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputSize::Compact => "compact",
            OutputSize::Full => "full",
        }
    }
}

/// Alpha Vantage client; the key is mandatory.
///
/// The API reports throttling and bad symbols with a 200 status and a
/// `Note` or `Error Message` body; both come back as sentinels.
#[derive(Debug, Clone)]
pub struct FinanceClient {
    endpoint: Endpoint,
    api_key: String,
}

impl FinanceClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let api_key = options.required_key("Alpha Vantage", "ALPHAVANTAGE_API_KEY")?;
        let endpoint = options.endpoint(ALPHA_VANTAGE_BASE, Duration::from_secs(30))?;
        Ok(Self { endpoint, api_key })
    }

    /// Call one API function; `Err(message)` carries a provider-reported error
    async fn call(&self, function: &str, params: &[(&str, &str)]) -> Result<Result<Value, String>, ClientError> {
        tracing::debug!("Alpha Vantage {}", function);

        let request = params.iter().fold(
            self.endpoint.get("").query("function", function),
            |request, (key, value)| request.query(*key, value),
        );
        let data = self
            .endpoint
            .fetch_json(&request.query("apikey", &self.api_key))
            .await?;

        for key in ["Note", "Error Message"] {
            if let Some(message) = data.get(key).and_then(Value::as_str) {
                tracing::warn!("Alpha Vantage {}: {}", key, message);
                return Ok(Err(message.to_string()));
            }
        }
        Ok(Ok(data))
    }

    /// Daily adjusted prices for an equity, newest first
    pub async fn get_daily_time_series(&self, symbol: &str, output_size: OutputSize) -> Result<Record, ClientError> {
        tracing::info!("Fetching daily series for {}", symbol);

        let outcome = self
            .call(
                "TIME_SERIES_DAILY_ADJUSTED",
                &[("symbol", symbol), ("outputsize", output_size.as_str())],
            )
            .await
            .and_then(|data| {
                let data = match data {
                    Ok(data) => data,
                    Err(message) => return Ok(error_record(message)),
                };
                let prices = series(&data, "Time Series (Daily)", |date, values| {
                    Ok(json!({
                        "date": date,
                        "open": decimal(values, "1. open")?,
                        "high": decimal(values, "2. high")?,
                        "low": decimal(values, "3. low")?,
                        "close": decimal(values, "4. close")?,
                        "adjusted_close": decimal(values, "5. adjusted close")?,
                        "volume": decimal(values, "6. volume")? as u64,
                    }))
                })?;
                into_record(json!({
                    "metadata": data.get("Meta Data").cloned().unwrap_or_else(|| json!({})),
                    "prices": prices,
                }))
            });

        sentinel("finance", "get_daily_time_series", outcome)
    }

    /// Realtime exchange rate between two currency codes
    pub async fn get_fx_rate(&self, from_currency: &str, to_currency: &str) -> Result<Record, ClientError> {
        tracing::info!("Fetching FX rate {}/{}", from_currency, to_currency);

        let outcome = self
            .call(
                "CURRENCY_EXCHANGE_RATE",
                &[("from_currency", from_currency), ("to_currency", to_currency)],
            )
            .await
            .and_then(|data| {
                let data = match data {
                    Ok(data) => data,
                    Err(message) => return Ok(error_record(message)),
                };
                let rate = data
                    .get("Realtime Currency Exchange Rate")
                    .cloned()
                    .unwrap_or_else(|| json!({}));
                into_record(json!({
                    "from_currency": pick(&rate, "/1. From_Currency Code"),
                    "to_currency": pick(&rate, "/3. To_Currency Code"),
                    "exchange_rate": decimal(&rate, "5. Exchange Rate")?,
                    "last_refreshed": pick(&rate, "/6. Last Refreshed"),
                    "bid_price": decimal(&rate, "8. Bid Price")?,
                    "ask_price": decimal(&rate, "9. Ask Price")?,
                }))
            });

        sentinel("finance", "get_fx_rate", outcome)
    }

    /// Daily quotes for a digital currency in a market currency, newest first
    pub async fn get_crypto_quote(&self, symbol: &str, market: &str) -> Result<Record, ClientError> {
        tracing::info!("Fetching crypto quotes for {} in {}", symbol, market);

        let outcome = self
            .call("DIGITAL_CURRENCY_DAILY", &[("symbol", symbol), ("market", market)])
            .await
            .and_then(|data| {
                let data = match data {
                    Ok(data) => data,
                    Err(message) => return Ok(error_record(message)),
                };
                let quotes = series(&data, "Time Series (Digital Currency Daily)", |date, values| {
                    Ok(json!({
                        "date": date,
                        "open": decimal(values, &format!("1a. open ({})", market))?,
                        "high": decimal(values, &format!("2a. high ({})", market))?,
                        "low": decimal(values, &format!("3a. low ({})", market))?,
                        "close": decimal(values, &format!("4a. close ({})", market))?,
                        "volume": decimal(values, "5. volume")?,
                        "market_cap": decimal(values, "6. market cap (USD)")?,
                    }))
                })?;
                into_record(json!({
                    "metadata": data.get("Meta Data").cloned().unwrap_or_else(|| json!({})),
                    "quotes": quotes,
                }))
            });

        sentinel("finance", "get_crypto_quote", outcome)
    }
}

/// Flatten a date-keyed series object into rows sorted newest first
fn series(
    data: &Value,
    key: &str,
    row: impl Fn(&str, &Value) -> Result<Value, ClientError>,
) -> Result<Vec<Value>, ClientError> {
    let empty = Map::new();
    let entries = data.get(key).and_then(Value::as_object).unwrap_or(&empty);

    let mut dated: Vec<(&String, &Value)> = entries.iter().collect();
    dated.sort_by(|a, b| b.0.cmp(a.0));
    dated.into_iter().map(|(date, values)| row(date, values)).collect()
}

/// Alpha Vantage sends numbers as strings.
///
/// A missing field reads as 0; a present field that is not a number is a
/// parse error.
fn decimal(values: &Value, key: &str) -> Result<f64, ClientError> {
    match values.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| {
            ClientError::Parse(format!("Alpha Vantage field '{}' is not a number: {:?}", key, s))
        }),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ClientError::Parse(format!("Alpha Vantage field '{}' is out of range", key))),
        Some(other) => Err(ClientError::Parse(format!(
            "Alpha Vantage field '{}' is not a number: {}",
            key, other
        ))),
    }
}

impl Adapter for FinanceClient {
    fn id(&self) -> &'static str {
        "finance"
    }

    fn name(&self) -> &'static str {
        "Alpha Vantage"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP
    }
}
