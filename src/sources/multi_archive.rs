//! Archive lookups across several providers.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{ArchiveResult, Record, ResultRecord};
use crate::sources::{
    error_record, Adapter, ArchiveClient, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::transport::Method;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Supported archive providers, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArchiveProvider {
    #[serde(rename = "wayback")]
    Wayback,
    #[serde(rename = "archiveis")]
    ArchiveIs,
    #[serde(rename = "memento")]
    Memento,
    #[serde(rename = "12ft")]
    TwelveFt,
}

impl ArchiveProvider {
    pub const ALL: [ArchiveProvider; 4] = [
        ArchiveProvider::Wayback,
        ArchiveProvider::ArchiveIs,
        ArchiveProvider::Memento,
        ArchiveProvider::TwelveFt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveProvider::Wayback => "wayback",
            ArchiveProvider::ArchiveIs => "archiveis",
            ArchiveProvider::Memento => "memento",
            ArchiveProvider::TwelveFt => "12ft",
        }
    }
}

impl std::fmt::Display for ArchiveProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveProvider {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        ArchiveProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == name)
            .ok_or_else(|| {
                let names: Vec<&str> = ArchiveProvider::ALL.iter().map(|p| p.as_str()).collect();
                ClientError::Configuration(format!(
                    "Unknown provider: {}. Use: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// Provider roots other than the Wayback Machine
#[derive(Debug, Clone)]
struct ProviderHosts {
    archive_is: String,
    memento: String,
    twelve_ft: String,
}

impl Default for ProviderHosts {
    fn default() -> Self {
        Self {
            archive_is: "https://archive.is".to_string(),
            memento: "http://timetravel.mementoweb.org/timemap/json".to_string(),
            twelve_ft: "https://12ft.io".to_string(),
        }
    }
}

impl ProviderHosts {
    fn under(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            archive_is: format!("{}/archiveis", root),
            memento: format!("{}/memento/timemap/json", root),
            twelve_ft: format!("{}/12ft", root),
        }
    }
}

/// Archive client spanning Wayback, archive.is, Memento and 12ft.io.
///
/// Never returns an error for a provider failure. A found archive is the
/// mapping form of an [`ArchiveResult`]; a failed lookup is a sentinel
/// `{"error": message}` mapping.
#[derive(Debug, Clone)]
pub struct MultiArchiveClient {
    wayback: ArchiveClient,
    endpoint: Endpoint,
    hosts: ProviderHosts,
}

impl MultiArchiveClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let hosts = options
            .base_url
            .as_deref()
            .map(ProviderHosts::under)
            .unwrap_or_default();

        let endpoint = options.endpoint("https://archive.is", PROBE_TIMEOUT)?;

        Ok(Self {
            wayback: ArchiveClient::new(options)?,
            endpoint,
            hosts,
        })
    }

    /// Look up (or with `capture`, create) an archive of `url` with one provider.
    ///
    /// `capture` only applies to archive.is.
    pub async fn get_archive(&self, url: &str, provider: ArchiveProvider, capture: bool) -> Record {
        tracing::info!("Looking up {} archive of {}", provider, url);

        let result = match provider {
            ArchiveProvider::Wayback => self.wayback(url).await,
            ArchiveProvider::ArchiveIs if capture => self.capture_archive_is(url).await,
            ArchiveProvider::ArchiveIs => self.archive_is(url).await,
            ArchiveProvider::Memento => self.memento(url).await,
            ArchiveProvider::TwelveFt => self.twelve_ft(url).await,
        };

        if result.success {
            return result.to_mapping();
        }

        let error = result
            .error
            .unwrap_or_else(|| format!("{} lookup failed", provider));
        tracing::warn!("{} lookup failed for {}: {}", provider, url, error);
        error_record(error)
    }

    /// Query every provider concurrently; one failing provider does not
    /// affect the others and still gets an entry
    pub async fn get_all_archives(&self, url: &str) -> BTreeMap<ArchiveProvider, Record> {
        let lookups = ArchiveProvider::ALL
            .into_iter()
            .map(|provider| async move { (provider, self.get_archive(url, provider, false).await) });

        join_all(lookups).await.into_iter().collect()
    }

    async fn wayback(&self, url: &str) -> ArchiveResult {
        match self.wayback.get_latest_snapshot(url).await {
            Ok(Some(snapshot)) => ArchiveResult::from_snapshot(snapshot),
            Ok(None) => ArchiveResult::failed("No Wayback snapshot found"),
            Err(e) => ArchiveResult::failed(format!("Wayback error: {}", e)),
        }
    }

    async fn archive_is(&self, url: &str) -> ArchiveResult {
        let archived = format!("{}/{}", self.hosts.archive_is, url);
        let request = self.endpoint.request(Method::Head, archived.as_str());

        match self.endpoint.send_raw(&request).await {
            Ok(response) if response.status == 200 => ArchiveResult::found(archived),
            Ok(_) => ArchiveResult::failed(
                "No Archive.is snapshot found. Use capture=true to create one.",
            ),
            Err(e) => ArchiveResult::failed(format!("Archive.is error: {}", e)),
        }
    }

    async fn capture_archive_is(&self, url: &str) -> ArchiveResult {
        let request = self
            .endpoint
            .request(Method::Post, format!("{}/submit/", self.hosts.archive_is))
            .form(vec![
                ("url".to_string(), url.to_string()),
                ("anyway".to_string(), "1".to_string()),
            ])
            .timeout(Duration::from_secs(60))
            .follow_redirects(false);

        let response = match self.endpoint.send_raw(&request).await {
            Ok(response) => response,
            Err(e) => return ArchiveResult::failed(format!("Archive.is error: {}", e)),
        };

        // The new capture is announced in Location, or in Refresh while it is still rendering
        let captured = response.header("location").map(str::to_string).or_else(|| {
            response
                .header("refresh")
                .and_then(|refresh| refresh.split_once("url="))
                .map(|(_, target)| target.trim().to_string())
        });

        match captured {
            Some(archive_url) if !archive_url.is_empty() => ArchiveResult::found(archive_url),
            _ => ArchiveResult::failed(format!(
                "Archive.is capture returned no archive URL (status {})",
                response.status
            )),
        }
    }

    async fn memento(&self, url: &str) -> ArchiveResult {
        let target = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };

        let request = self
            .endpoint
            .request(Method::Get, format!("{}/{}", self.hosts.memento, target));

        let data = match self.endpoint.fetch_json(&request).await {
            Ok(data) => data,
            Err(e) => return ArchiveResult::failed(format!("Memento error: {}", e)),
        };

        let latest = data
            .pointer("/mementos/list")
            .and_then(Value::as_array)
            .and_then(|list| list.last())
            .and_then(|m| m.get("uri"))
            .and_then(Value::as_str);

        match latest {
            Some(uri) => ArchiveResult::found(uri),
            None => ArchiveResult::failed("No Memento snapshots found"),
        }
    }

    async fn twelve_ft(&self, url: &str) -> ArchiveResult {
        let proxied = format!("{}/{}", self.hosts.twelve_ft, url);
        let request = self
            .endpoint
            .request(Method::Head, proxied.as_str())
            .follow_redirects(false);

        match self.endpoint.send_raw(&request).await {
            Ok(response) if matches!(response.status, 200 | 302) => ArchiveResult::found(proxied),
            Ok(response) => {
                ArchiveResult::failed(format!("12ft.io returned status {}", response.status))
            }
            Err(e) => ArchiveResult::failed(format!("12ft.io error: {}", e)),
        }
    }
}

impl Adapter for MultiArchiveClient {
    fn id(&self) -> &'static str {
        "multi_archive"
    }

    fn name(&self) -> &'static str {
        "Multi-provider archives"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP | SourceCapabilities::ARCHIVE
    }
}
