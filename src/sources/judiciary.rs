//! US federal judiciary financial disclosures.
//!
//! Disclosures are published as scanned PDF forms with no query API, so every
//! operation answers locally with an empty result and a pointer to the
//! manual search. No request is ever sent.

use serde_json::json;

use crate::models::Record;
use crate::sources::{Adapter, ClientError, ClientOptions, ErrorMode, SourceCapabilities};
use crate::utils::into_record;

const JUDICIARY_BASE: &str = "https://www.judicialfinancialreport.org";

#[derive(Debug, Clone)]
pub struct JudiciaryClient {
    base_url: String,
}

impl JudiciaryClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(JUDICIARY_BASE)
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url)?;

        tracing::info!("Judiciary client initialized; disclosures are not machine-readable");
        Ok(Self { base_url })
    }

    pub fn search_judges(
        &self,
        name: Option<&str>,
        court: Option<&str>,
        year: Option<u16>,
    ) -> Result<Record, ClientError> {
        tracing::warn!(
            "Judge search unavailable (name={:?}, court={:?}, year={:?})",
            name,
            court,
            year
        );

        into_record(json!({
            "judges": [],
            "note": "Judge search requires parsing the published PDF disclosures.",
            "data_source": format!("{}/", self.base_url),
            "alternative": "Consider ProPublica's Free the Files or a similar service",
        }))
    }

    pub fn get_judge_disclosures(&self, judge_name: &str, year: u16) -> Result<Record, ClientError> {
        tracing::warn!("Disclosure retrieval unavailable for {} ({})", judge_name, year);

        into_record(json!({
            "judge": judge_name,
            "year": year,
            "note": "Disclosures are only available as PDF forms through the official site.",
            "manual_access": format!("{}/search", self.base_url),
        }))
    }

    pub fn get_asset_details(&self, judge_name: &str, year: u16) -> Result<Record, ClientError> {
        tracing::warn!("Asset details unavailable for {} ({})", judge_name, year);

        into_record(json!({
            "judge": judge_name,
            "year": year,
            "assets": [],
            "note": "Asset details require parsed PDF disclosures.",
            "implementation_needed": [
                "PDF form parser",
                "Financial statement extractor",
                "Database of historical disclosures",
            ],
        }))
    }
}

impl Adapter for JudiciaryClient {
    fn id(&self) -> &'static str {
        "judiciary"
    }

    fn name(&self) -> &'static str {
        "US Judiciary Financial Disclosures"
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
    use crate::transport::MockTransport;
    use std::sync::Arc;

    #[test]
    fn test_placeholders_do_no_io() {
        let mock = Arc::new(MockTransport::new());
        let judiciary = JudiciaryClient::new(ClientOptions::new().transport(mock.clone())).unwrap();

        let judges = judiciary.search_judges(Some("Smith"), None, Some(2023)).unwrap();
        assert_eq!(judges["judges"], json!([]));
        assert_eq!(judges["data_source"], "https://www.judicialfinancialreport.org/");

        let disclosures = judiciary.get_judge_disclosures("Jane Smith", 2023).unwrap();
        assert_eq!(disclosures["year"], 2023);
        assert_eq!(
            disclosures["manual_access"],
            "https://www.judicialfinancialreport.org/search"
        );

        let assets = judiciary.get_asset_details("Jane Smith", 2023).unwrap();
        assert_eq!(assets["assets"], json!([]));
        assert_eq!(assets["implementation_needed"].as_array().unwrap().len(), 3);

        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = JudiciaryClient::new(ClientOptions::new().base_url("not a url")).unwrap_err();
        assert!(err.is_configuration());
    }
}
