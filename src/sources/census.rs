//! US Census Bureau data API source.
//!
//! Tables come back from the API as a header row followed by data rows; each
//! row becomes one mapping with friendly column names and numeric estimates.

use serde_json::{json, Map, Number, Value};
use std::time::Duration;

use crate::config::default_cache_dir;
use crate::models::Record;
use crate::sources::{
    sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities,
};
use crate::utils::ResponseCache;

const CENSUS_API_BASE: &str = "https://api.census.gov/data";

/// Variables used for the SAIPE poverty proxy
const SAIPE_VARIABLES: &[(&str, &str)] = &[
    ("B17001_001E", "total_pop"),
    ("B17001_002E", "poverty_pop"),
];

/// An American Community Survey table request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcsRequest {
    pub year: u16,
    /// Census variable code and the column name it is renamed to
    pub variables: Vec<(String, String)>,
    pub geography: String,
    pub dataset: String,
    /// State FIPS code restricting the result
    pub state: Option<String>,
}

impl AcsRequest {
    /// Every county, 5-year estimates
    pub fn new(year: u16) -> Self {
        Self {
            year,
            variables: Vec::new(),
            geography: "county:*".to_string(),
            dataset: "acs5".to_string(),
            state: None,
        }
    }

    pub fn variable(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.variables.push((code.into(), name.into()));
        self
    }

    pub fn geography(mut self, geography: impl Into<String>) -> Self {
        self.geography = geography.into();
        self
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Stable fingerprint of the request parameters
    fn cache_key(&self) -> String {
        let mut codes: Vec<&str> = self.variables.iter().map(|(code, _)| code.as_str()).collect();
        codes.sort_unstable();

        let mut key = format!(
            "acs_{}_{}_{}_{}",
            self.year,
            self.dataset,
            self.geography.replace(':', "_"),
            codes.join("-")
        );
        if let Some(state) = &self.state {
            key.push_str(&format!("_state{}", state));
        }
        key
    }
}

/// Census Bureau client with an optional on-disk cache
#[derive(Debug, Clone)]
pub struct CensusClient {
    endpoint: Endpoint,
    api_key: Option<String>,
    cache: ResponseCache,
}

impl CensusClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let endpoint = options.endpoint(CENSUS_API_BASE, Duration::from_secs(30))?;
        let cache_dir = options
            .cache_dir
            .clone()
            .unwrap_or_else(|| default_cache_dir().join("census"));

        Ok(Self {
            endpoint,
            api_key: options.key().map(str::to_string),
            cache: ResponseCache::new(cache_dir, options.use_cache.unwrap_or(true)),
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Fetch an ACS table
    pub async fn fetch_acs(&self, request: &AcsRequest) -> Result<Record, ClientError> {
        if request.variables.is_empty() {
            return Err(ClientError::Configuration(
                "fetch_acs needs at least one variable".to_string(),
            ));
        }

        let key = request.cache_key();
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let outcome = self
            .fetch_table(
                request.year,
                &request.dataset,
                &request.variables,
                &request.geography,
                request.state.as_deref(),
            )
            .await
            .map(|records| {
                tracing::info!("Fetched ACS data for {} geographies", records.len());
                table_record(
                    format!("Census ACS {} {}", request.dataset, request.year),
                    request.year,
                    &request.geography,
                    records,
                )
            });

        self.store(&key, sentinel("census", "fetch_acs", outcome))
    }

    /// Small Area Income and Poverty Estimates, approximated from ACS poverty tables.
    ///
    /// `geography` is a level name (`county`, `state` or `us`).
    pub async fn fetch_saipe(
        &self,
        year: u16,
        geography: &str,
        state: Option<&str>,
    ) -> Result<Record, ClientError> {
        let mut key = format!("saipe_{}_{}", year, geography);
        if let Some(state) = state {
            key.push_str(&format!("_state{}", state));
        }
        if let Some(cached) = self.cached(&key) {
            return Ok(cached);
        }

        let variables: Vec<(String, String)> = SAIPE_VARIABLES
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();

        // A state filter only applies below the state level
        let state = state.filter(|_| geography == "county");
        let geography_clause = format!("{}:*", geography);

        let outcome = self
            .fetch_table(year, "acs5", &variables, &geography_clause, state)
            .await
            .map(|mut records| {
                for record in &mut records {
                    let rate = poverty_rate(record);
                    record.insert("poverty_rate".to_string(), rate);
                }
                tracing::info!("Fetched SAIPE data for {} geographies", records.len());
                table_record(
                    format!("Census ACS {} (SAIPE proxy)", year),
                    year,
                    &geography_clause,
                    records,
                )
            });

        self.store(&key, sentinel("census", "fetch_saipe", outcome))
    }

    /// Total population (`B01003_001E`)
    pub async fn fetch_population(
        &self,
        year: u16,
        geography: &str,
        state: Option<&str>,
    ) -> Result<Record, ClientError> {
        let mut request = AcsRequest::new(year)
            .variable("B01003_001E", "total_population")
            .geography(geography);
        if let Some(state) = state {
            request = request.state(state);
        }
        self.fetch_acs(&request).await
    }

    /// Describe a dataset for provenance records
    pub fn metadata(&self, source: &str, dataset: &str) -> Record {
        let value = json!({
            "source": source,
            "dataset": dataset,
            "collection_date": chrono::Utc::now().to_rfc3339(),
            "api_key_used": self.api_key.is_some(),
            "cache_enabled": self.cache.is_enabled(),
            "cache_directory": self.cache.dir().display().to_string(),
        });
        match value {
            Value::Object(map) => map,
            _ => Record::new(),
        }
    }

    /// Remove cached tables matching a glob such as `acs_2022*`, or all of them
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        self.cache.clear(pattern)
    }

    fn cached(&self, key: &str) -> Option<Record> {
        let mut record = self.cache.get(key)?;
        tracing::info!("Using cached Census data for {}", key);
        record.insert("cached".to_string(), Value::Bool(true));
        Some(record)
    }

    /// Cache successful tables; sentinels are never cached
    fn store(&self, key: &str, outcome: Result<Record, ClientError>) -> Result<Record, ClientError> {
        let mut record = outcome?;
        if record.contains_key("records") {
            self.cache.put(key, &record);
            record.insert("cached".to_string(), Value::Bool(false));
        }
        Ok(record)
    }

    async fn fetch_table(
        &self,
        year: u16,
        dataset: &str,
        variables: &[(String, String)],
        geography: &str,
        state: Option<&str>,
    ) -> Result<Vec<Record>, ClientError> {
        let codes: Vec<&str> = std::iter::once("NAME")
            .chain(variables.iter().map(|(code, _)| code.as_str()))
            .collect();

        let request = self
            .endpoint
            .get(&format!("/{}/acs/{}", year, dataset))
            .query("get", codes.join(","))
            .query("for", geography)
            .query_opt("in", state.map(|s| format!("state:{}", s)))
            .query_opt("key", self.api_key.as_deref());

        tracing::info!("Fetching Census {} {} for {}", dataset, year, geography);
        let response = self.endpoint.send(&request).await?;
        let rows: Vec<Vec<Value>> = response.json()?;

        Ok(normalize_rows(&rows, variables, geography.contains("county")))
    }
}

impl Adapter for CensusClient {
    fn id(&self) -> &'static str {
        "census"
    }

    fn name(&self) -> &'static str {
        "US Census Bureau"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP | SourceCapabilities::CACHE
    }
}

/// Rename columns, convert estimates to numbers and add county FIPS codes
fn normalize_rows(rows: &[Vec<Value>], variables: &[(String, String)], county: bool) -> Vec<Record> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };

    let columns: Vec<(String, bool)> = header
        .iter()
        .map(|column| {
            let code = column.as_str().unwrap_or_default();
            match variables.iter().find(|(c, _)| c == code) {
                Some((_, name)) => (name.clone(), true),
                None if code == "NAME" => ("name".to_string(), false),
                None => (code.to_string(), false),
            }
        })
        .collect();

    data.iter()
        .map(|row| {
            let mut record: Record = Map::new();
            for ((name, numeric), cell) in columns.iter().zip(row) {
                let value = match (numeric, cell) {
                    (true, Value::String(raw)) => to_number(raw),
                    _ => cell.clone(),
                };
                record.insert(name.clone(), value);
            }

            if county {
                if let (Some(state), Some(county)) = (
                    record.get("state").and_then(Value::as_str),
                    record.get("county").and_then(Value::as_str),
                ) {
                    let fips = format!("{}{}", state, county);
                    record.insert("fips".to_string(), Value::String(fips));
                }
            }
            record
        })
        .collect()
}

/// Numeric estimate, or `null` for values that do not parse
fn to_number(raw: &str) -> Value {
    if let Ok(n) = raw.trim().parse::<i64>() {
        return Value::Number(n.into());
    }
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn poverty_rate(record: &Record) -> Value {
    let total = record.get("total_pop").and_then(Value::as_f64);
    let poor = record.get("poverty_pop").and_then(Value::as_f64);
    match (total, poor) {
        (Some(total), Some(poor)) if total > 0.0 => {
            let rate = (poor / total * 100.0 * 100.0).round() / 100.0;
            Number::from_f64(rate).map(Value::Number).unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn table_record(source: String, year: u16, geography: &str, records: Vec<Record>) -> Record {
    let mut record = Record::new();
    record.insert("source".to_string(), Value::String(source));
    record.insert("year".to_string(), Value::from(year));
    record.insert("geography".to_string(), Value::String(geography.to_string()));
    record.insert("count".to_string(), Value::from(records.len()));
    record.insert(
        "records".to_string(),
        Value::Array(records.into_iter().map(Value::Object).collect()),
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::is_error_record;
    use crate::transport::{MockTransport, TransportError};
    use std::sync::Arc;
    use tempfile::tempdir;

    const ACS_URL: &str = "https://api.census.gov/data/2022/acs/acs5";

    fn acs_rows() -> Value {
        json!([
            ["NAME", "B01003_001E", "B17001_002E", "state", "county"],
            ["Autauga County, Alabama", "58805", "6296", "01", "001"],
            ["Baldwin County, Alabama", "231767", null, "01", "003"]
        ])
    }

    fn client(mock: Arc<MockTransport>, cache_dir: &std::path::Path, use_cache: bool) -> CensusClient {
        CensusClient::new(
            ClientOptions::new()
                .transport(mock)
                .api_key("census-key")
                .cache_dir(cache_dir)
                .use_cache(use_cache),
        )
        .unwrap()
    }

    fn request() -> AcsRequest {
        AcsRequest::new(2022)
            .variable("B01003_001E", "total_population")
            .variable("B17001_002E", "poverty_population")
            .state("01")
    }

    #[tokio::test]
    async fn test_fetch_acs_normalizes_rows() {
        let dir = tempdir().unwrap();
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(ACS_URL, 200, acs_rows());

        let result = client(mock.clone(), dir.path(), false)
            .fetch_acs(&request())
            .await
            .unwrap();

        assert_eq!(result["count"], 2);
        assert_eq!(result["cached"], false);
        let first = &result["records"][0];
        assert_eq!(first["name"], "Autauga County, Alabama");
        assert_eq!(first["total_population"], 58805);
        assert_eq!(first["fips"], "01001");
        assert_eq!(result["records"][1]["poverty_population"], Value::Null);

        let sent = mock.last_request().unwrap();
        assert_eq!(sent.query_value("get"), Some("NAME,B01003_001E,B17001_002E"));
        assert_eq!(sent.query_value("for"), Some("county:*"));
        assert_eq!(sent.query_value("in"), Some("state:01"));
        assert_eq!(sent.query_value("key"), Some("census-key"));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let dir = tempdir().unwrap();
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(ACS_URL, 200, acs_rows());
        let census = client(mock.clone(), dir.path(), true);

        let first = census.fetch_acs(&request()).await.unwrap();
        let second = census.fetch_acs(&request()).await.unwrap();

        assert_eq!(mock.requests().len(), 1);
        assert_eq!(second["cached"], true);
        assert_eq!(first["records"], second["records"]);

        assert_eq!(census.clear_cache(Some("acs_2022*")), 1);
        census.fetch_acs(&request()).await.unwrap();
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_saipe_poverty_rate() {
        let dir = tempdir().unwrap();
        let mock = Arc::new(MockTransport::new());
        mock.respond_json(
            ACS_URL,
            200,
            json!([
                ["NAME", "B17001_001E", "B17001_002E", "state"],
                ["Alabama", "4900000", "784000", "01"],
                ["Nowhere", "0", "0", "99"]
            ]),
        );

        let result = client(mock.clone(), dir.path(), false)
            .fetch_saipe(2022, "state", Some("01"))
            .await
            .unwrap();

        assert_eq!(result["records"][0]["poverty_rate"], 16.0);
        assert_eq!(result["records"][1]["poverty_rate"], Value::Null);
        assert!(result["records"][0].get("fips").is_none());

        let sent = mock.last_request().unwrap();
        assert_eq!(sent.query_value("for"), Some("state:*"));
        assert_eq!(sent.query_value("in"), None);
    }

    #[tokio::test]
    async fn test_failure_is_sentinel_and_not_cached() {
        let dir = tempdir().unwrap();
        let mock = Arc::new(MockTransport::new());
        mock.fail(ACS_URL, TransportError::Timeout(Duration::from_secs(30)));
        let census = client(mock, dir.path(), true);

        let result = census.fetch_population(2022, "county:*", None).await.unwrap();
        assert!(is_error_record(&result));
        assert!(census.cache().is_empty());
    }

    #[tokio::test]
    async fn test_empty_variables_is_configuration_error() {
        let dir = tempdir().unwrap();
        let census = client(Arc::new(MockTransport::new()), dir.path(), false);
        let err = census.fetch_acs(&AcsRequest::new(2022)).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_metadata() {
        let dir = tempdir().unwrap();
        let census = client(Arc::new(MockTransport::new()), dir.path(), true);
        let meta = census.metadata("Census Bureau", "ACS 2022");
        assert_eq!(meta["api_key_used"], true);
        assert_eq!(meta["cache_enabled"], true);
        assert_eq!(meta["dataset"], "ACS 2022");
    }
}
