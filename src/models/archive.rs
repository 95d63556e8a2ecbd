//! Web archive records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ResultRecord;
use crate::sources::ClientError;

/// Timestamp layout used throughout the Wayback Machine APIs
pub const WAYBACK_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// One archived capture of a URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub url: String,

    pub timestamp: NaiveDateTime,

    /// HTTP status recorded at capture time
    pub status_code: Option<u16>,

    /// The URL that was archived
    pub original_url: String,

    pub archive_url: String,
}

impl ResultRecord for Snapshot {}

impl Snapshot {
    /// Parse the `closest` object of an availability response
    pub fn from_availability(closest: &Value, original_url: &str) -> Result<Self, ClientError> {
        let url = closest
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Parse("snapshot is missing 'url'".to_string()))?;

        let timestamp = closest
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Parse("snapshot is missing 'timestamp'".to_string()))
            .and_then(parse_timestamp)?;

        let status_code = match closest.get("status") {
            Some(Value::String(s)) => s.parse().ok(),
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        };

        Ok(Self {
            url: url.to_string(),
            timestamp,
            status_code,
            original_url: original_url.to_string(),
            archive_url: url.to_string(),
        })
    }

    /// Parse one CDX row: `[urlkey, timestamp, original, mimetype, statuscode, ...]`
    pub fn from_cdx_row(row: &[String], original_url: &str) -> Result<Self, ClientError> {
        if row.len() < 5 {
            return Err(ClientError::Parse(format!(
                "CDX row has {} columns, expected at least 5",
                row.len()
            )));
        }

        let timestamp = parse_timestamp(&row[1])?;
        let archive_url = format!("https://web.archive.org/web/{}/{}", row[1], row[2]);

        Ok(Self {
            url: archive_url.clone(),
            timestamp,
            // CDX reports "-" for captures without a status (redirect stubs, revisits)
            status_code: row[4].parse().ok(),
            original_url: original_url.to_string(),
            archive_url,
        })
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, ClientError> {
    NaiveDateTime::parse_from_str(raw, WAYBACK_TIMESTAMP_FORMAT)
        .map_err(|e| ClientError::Parse(format!("invalid archive timestamp '{}': {}", raw, e)))
}

/// Outcome of an archive lookup or capture request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveResult {
    pub success: bool,

    pub archive_url: Option<String>,

    pub snapshot: Option<Snapshot>,

    pub error: Option<String>,
}

impl ResultRecord for ArchiveResult {}

impl ArchiveResult {
    /// A successful result pointing at `archive_url`
    pub fn found(archive_url: impl Into<String>) -> Self {
        Self {
            success: true,
            archive_url: Some(archive_url.into()),
            snapshot: None,
            error: None,
        }
    }

    /// A successful result backed by a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            success: true,
            archive_url: Some(snapshot.archive_url.clone()),
            snapshot: Some(snapshot),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            archive_url: None,
            snapshot: None,
            error: Some(error.into()),
        }
    }
}
