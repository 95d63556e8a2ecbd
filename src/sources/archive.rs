//! Internet Archive Wayback Machine source.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::time::Duration;

use crate::models::{ArchiveResult, Snapshot, WAYBACK_TIMESTAMP_FORMAT};
use crate::sources::{Adapter, ClientError, ClientOptions, Endpoint, ErrorMode, SourceCapabilities};
use crate::transport::{HttpRequest, Method};

const WAYBACK_ROOT: &str = "https://web.archive.org";

/// Slow Wayback operations (CDX listing, save requests)
const LONG_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause before re-checking a freshly requested capture
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// CDX row cap used when the caller passes a limit of 0
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 100;

/// The three Wayback Machine endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaybackHosts {
    pub available: String,
    pub save: String,
    pub cdx: String,
}

impl Default for WaybackHosts {
    fn default() -> Self {
        Self {
            available: "https://archive.org/wayback/available".to_string(),
            save: "https://web.archive.org/save/".to_string(),
            cdx: "https://web.archive.org/cdx/search/cdx".to_string(),
        }
    }
}

impl WaybackHosts {
    /// All endpoints under a single root (mirrors and local test servers)
    pub fn under(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            available: format!("{}/wayback/available", root),
            save: format!("{}/save/", root),
            cdx: format!("{}/cdx/search/cdx", root),
        }
    }
}

/// Wayback Machine client
///
/// "Not archived" is reported as `Ok(None)`; request failures are errors.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    endpoint: Endpoint,
    hosts: WaybackHosts,
}

impl ArchiveClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let hosts = options
            .base_url
            .as_deref()
            .map(WaybackHosts::under)
            .unwrap_or_default();

        let endpoint = options
            .endpoint(WAYBACK_ROOT, Duration::from_secs(30))?
            .with_header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
            )
            .with_header("Accept-Language", "en-US,en;q=0.5");

        Ok(Self { endpoint, hosts })
    }

    pub fn hosts(&self) -> &WaybackHosts {
        &self.hosts
    }

    fn availability_request(&self, url: &str, timestamp: Option<&NaiveDateTime>) -> HttpRequest {
        self.endpoint
            .request(Method::Get, self.hosts.available.as_str())
            .query("url", url)
            .query_opt(
                "timestamp",
                timestamp.map(|ts| ts.format(WAYBACK_TIMESTAMP_FORMAT)),
            )
    }

    async fn closest(&self, request: HttpRequest, url: &str) -> Result<Option<Snapshot>, ClientError> {
        let data = self.endpoint.fetch_json(&request).await?;

        let closest = match data.pointer("/archived_snapshots/closest") {
            Some(closest) if closest.is_object() => closest,
            _ => return Ok(None),
        };

        if closest.get("available").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }

        Snapshot::from_availability(closest, url).map(Some)
    }

    /// Most recent snapshot of a URL
    pub async fn get_latest_snapshot(&self, url: &str) -> Result<Option<Snapshot>, ClientError> {
        tracing::info!("Checking for archived snapshots of: {}", url);

        let snapshot = self.closest(self.availability_request(url, None), url).await?;
        match &snapshot {
            Some(s) => tracing::info!("Found snapshot from {}", s.timestamp),
            None => tracing::info!("No archived snapshots found for: {}", url),
        }
        Ok(snapshot)
    }

    /// Snapshot closest to a point in time
    pub async fn get_snapshot_at_timestamp(
        &self,
        url: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Option<Snapshot>, ClientError> {
        tracing::info!(
            "Getting snapshot of {} near {}",
            url,
            timestamp.format(WAYBACK_TIMESTAMP_FORMAT)
        );

        let request = self.availability_request(url, Some(&timestamp));
        self.closest(request, url).await
    }

    /// Every capture of a URL from the CDX index, oldest first.
    ///
    /// A `limit` of 0 means [`DEFAULT_SNAPSHOT_LIMIT`]; the CDX server would
    /// otherwise read it as "no limit".
    pub async fn get_all_snapshots(
        &self,
        url: &str,
        limit: usize,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Snapshot>, ClientError> {
        let limit = if limit == 0 { DEFAULT_SNAPSHOT_LIMIT } else { limit };
        tracing::info!("Getting all snapshots for: {} (limit={})", url, limit);

        let request = self
            .endpoint
            .request(Method::Get, self.hosts.cdx.as_str())
            .timeout(LONG_TIMEOUT)
            .query("url", url)
            .query("output", "json")
            .query("limit", limit)
            .query_opt("from", from.map(|d| d.format("%Y%m%d")))
            .query_opt("to", to.map(|d| d.format("%Y%m%d")));

        let response = self.endpoint.send(&request).await?;
        if response.body.trim().is_empty() {
            tracing::info!("No snapshots found");
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<String>> = response.json()?;

        // First row is the column header
        let snapshots = rows
            .iter()
            .skip(1)
            .filter(|row| row.len() >= 5)
            .map(|row| Snapshot::from_cdx_row(row, url))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Found {} snapshots", snapshots.len());
        Ok(snapshots)
    }

    /// Ask the Wayback Machine to capture a URL.
    ///
    /// Returns the existing snapshot when one is already available. With
    /// `wait`, sleeps for `retry_delay` and checks once for the new capture.
    pub async fn archive_url(
        &self,
        url: &str,
        wait: bool,
        retry_delay: Duration,
    ) -> Result<ArchiveResult, ClientError> {
        if let Some(existing) = self.get_latest_snapshot(url).await? {
            tracing::info!("URL already archived: {}", existing.archive_url);
            return Ok(ArchiveResult::from_snapshot(existing));
        }

        tracing::info!("Requesting archive of: {}", url);
        let request = self
            .endpoint
            .request(Method::Get, format!("{}{}", self.hosts.save, url))
            .timeout(LONG_TIMEOUT);

        let response = self.endpoint.send_raw(&request).await?;
        tracing::debug!("Archive request status: {}", response.status);

        if !wait {
            return Ok(if matches!(response.status, 200 | 302) {
                let captured = response.url.contains("/web/").then(|| response.url.clone());
                ArchiveResult {
                    success: true,
                    archive_url: captured,
                    snapshot: None,
                    error: None,
                }
            } else {
                ArchiveResult::failed(format!("Status code: {}", response.status))
            });
        }

        tracing::info!("Waiting {:?} for archiving to complete", retry_delay);
        tokio::time::sleep(retry_delay).await;

        match self.get_latest_snapshot(url).await? {
            Some(snapshot) => {
                tracing::info!("Successfully archived: {}", snapshot.archive_url);
                Ok(ArchiveResult::from_snapshot(snapshot))
            }
            None => {
                tracing::warn!("Archive request submitted but snapshot not found");
                Ok(ArchiveResult::failed(
                    "Archive request submitted but snapshot not yet available",
                ))
            }
        }
    }
}

impl Adapter for ArchiveClient {
    fn id(&self) -> &'static str {
        "archive"
    }

    fn name(&self) -> &'static str {
        "Wayback Machine"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Raise
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::LOOKUP | SourceCapabilities::ARCHIVE
    }
}
