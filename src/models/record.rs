//! Generic mapping form shared by every result record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::sources::ClientError;

/// Ordered field-name to value mapping.
///
/// `serde_json` is built with `preserve_order`, so keys keep the order in
/// which a record declares its fields.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Conversion between a typed record and its [`Record`] form.
///
/// Absent optional fields become `null`; they are never dropped.
pub trait ResultRecord: Serialize + DeserializeOwned {
    /// Convert into an ordered mapping, nested records included
    fn to_mapping(&self) -> Record {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // Records are plain structs and always serialize to an object
            _ => Record::new(),
        }
    }

    /// Rebuild a record from its mapping form
    fn from_mapping(mapping: Record) -> Result<Self, ClientError> {
        serde_json::from_value(serde_json::Value::Object(mapping)).map_err(ClientError::from)
    }
}

/// Sort key accepted by the literature search adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Relevance,
    Date,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::Date => "date",
        }
    }
}

/// Lenient parse: anything other than `date` sorts by relevance.
impl From<&str> for SortBy {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "date" => SortBy::Date,
            "relevance" => SortBy::Relevance,
            other => {
                tracing::debug!("Unsupported sort key '{}', using relevance", other);
                SortBy::Relevance
            }
        }
    }
}

impl From<String> for SortBy {
    fn from(value: String) -> Self {
        SortBy::from(value.as_str())
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_by_parsing() {
        assert_eq!(SortBy::from("date"), SortBy::Date);
        assert_eq!(SortBy::from("DATE"), SortBy::Date);
        assert_eq!(SortBy::from("relevance"), SortBy::Relevance);
        assert_eq!(SortBy::from("invalid"), SortBy::Relevance);
        assert_eq!(SortBy::from(""), SortBy::Relevance);
    }
}
