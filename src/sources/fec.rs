//! Federal Election Commission campaign finance source (OpenFEC).

use serde_json::{json, Value};
use std::time::Duration;

use crate::models::Record;
use crate::sources::{
    error_record, sentinel, Adapter, ClientError, ClientOptions, Endpoint, ErrorMode,
    SourceCapabilities,
};
use crate::transport::HttpRequest;
use crate::utils::{into_record, pick};

const FEC_API_BASE: &str = "https://api.open.fec.gov/v1";

/// Largest page OpenFEC serves
pub const MAX_PER_PAGE: usize = 100;
const DEFAULT_PER_PAGE: usize = 20;

/// Candidate search filters; unset fields are omitted from the request
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateSearch {
    pub name: Option<String>,
    /// `H` (House), `S` (Senate) or `P` (President)
    pub office: Option<String>,
    pub state: Option<String>,
    /// Party code such as `DEM` or `REP`
    pub party: Option<String>,
    pub cycle: Option<u16>,
    pub per_page: usize,
}

impl Default for CandidateSearch {
    fn default() -> Self {
        Self {
            name: None,
            office: None,
            state: None,
            party: None,
            cycle: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl CandidateSearch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn office(mut self, office: impl Into<String>) -> Self {
        self.office = Some(office.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    pub fn cycle(mut self, cycle: u16) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }
}

/// Schedule B (spending) filters for one committee
#[derive(Debug, Clone, PartialEq)]
pub struct DisbursementRequest {
    pub committee_id: String,
    pub min_amount: Option<f64>,
    /// Latest disbursement date, `YYYY-MM-DD`
    pub max_date: Option<String>,
    pub per_page: usize,
}

impl DisbursementRequest {
    pub fn new(committee_id: impl Into<String>) -> Self {
        Self {
            committee_id: committee_id.into(),
            min_amount: None,
            max_date: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn min_amount(mut self, amount: f64) -> Self {
        self.min_amount = Some(amount);
        self
    }

    pub fn max_date(mut self, date: impl Into<String>) -> Self {
        self.max_date = Some(date.into());
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }
}

/// Schedule A (individual contribution) filters
#[derive(Debug, Clone, PartialEq)]
pub struct ContributionSearch {
    pub contributor_name: Option<String>,
    pub committee_id: Option<String>,
    pub min_amount: Option<f64>,
    pub max_date: Option<String>,
    pub per_page: usize,
}

impl Default for ContributionSearch {
    fn default() -> Self {
        Self {
            contributor_name: None,
            committee_id: None,
            min_amount: None,
            max_date: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ContributionSearch {
    pub fn contributor(name: impl Into<String>) -> Self {
        Self {
            contributor_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn committee(mut self, committee_id: impl Into<String>) -> Self {
        self.committee_id = Some(committee_id.into());
        self
    }

    pub fn min_amount(mut self, amount: f64) -> Self {
        self.min_amount = Some(amount);
        self
    }

    pub fn max_date(mut self, date: impl Into<String>) -> Self {
        self.max_date = Some(date.into());
        self
    }

    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }
}

/// OpenFEC client; the key is mandatory and sent as `X-Api-Key`
#[derive(Debug, Clone)]
pub struct FecClient {
    endpoint: Endpoint,
}

impl FecClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let api_key = options.required_key("FEC", "FEC_API_KEY")?;
        let endpoint = options
            .endpoint(FEC_API_BASE, Duration::from_secs(30))?
            .with_header("X-Api-Key", api_key);
        Ok(Self { endpoint })
    }

    fn page(request: HttpRequest, per_page: usize) -> HttpRequest {
        request.query("per_page", per_page.clamp(1, MAX_PER_PAGE))
    }

    /// Fetch a paginated listing as `{key: results, total_count, page}`
    async fn listing(&self, request: HttpRequest, key: &str, operation: &str) -> Result<Record, ClientError> {
        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            let mut record = Record::new();
            record.insert(key.to_string(), data.get("results").cloned().unwrap_or(json!([])));
            record.insert(
                "total_count".to_string(),
                data.pointer("/pagination/count").cloned().unwrap_or(json!(0)),
            );
            record.insert(
                "page".to_string(),
                data.pointer("/pagination/page").cloned().unwrap_or(json!(1)),
            );
            Ok(record)
        });

        sentinel("fec", operation, outcome)
    }

    /// Fetch the first entry of `results`, or a sentinel naming what is missing
    async fn first_result(
        &self,
        request: HttpRequest,
        operation: &str,
        not_found: &str,
        shape: impl FnOnce(&Value) -> Value,
    ) -> Result<Record, ClientError> {
        let outcome = self.endpoint.fetch_json(&request).await.and_then(|data| {
            match data.pointer("/results/0") {
                Some(first) => into_record(shape(first)),
                None => Ok(error_record(not_found)),
            }
        });

        sentinel("fec", operation, outcome)
    }

    pub async fn search_candidates(&self, search: &CandidateSearch) -> Result<Record, ClientError> {
        tracing::info!("Searching FEC candidates: {:?}", search.name);

        let request = Self::page(self.endpoint.get("/candidates/search/"), search.per_page)
            .query_opt("name", search.name.as_deref())
            .query_opt("office", search.office.as_deref())
            .query_opt("state", search.state.as_deref())
            .query_opt("party", search.party.as_deref())
            .query_opt("cycle", search.cycle);

        self.listing(request, "candidates", "search_candidates").await
    }

    /// Receipts, spending and cash on hand for a candidate
    pub async fn get_candidate_totals(&self, candidate_id: &str, cycle: Option<u16>) -> Result<Record, ClientError> {
        tracing::info!("Fetching FEC totals for candidate {}", candidate_id);

        let request = self
            .endpoint
            .get(&format!("/candidate/{}/totals/", candidate_id))
            .query_opt("cycle", cycle);

        self.first_result(request, "get_candidate_totals", "No financial data found", |totals| {
            json!({
                "candidate_id": candidate_id,
                "cycle": pick(totals, "/cycle"),
                "receipts": amount(totals, "receipts"),
                "disbursements": amount(totals, "disbursements"),
                "cash_on_hand": amount(totals, "cash_on_hand_end_period"),
                "debts": amount(totals, "debts_owed_by_committee"),
                "individual_contributions": amount(totals, "individual_contributions"),
                "pac_contributions": amount(totals, "political_party_committee_contributions"),
            })
        })
        .await
    }

    pub async fn get_committee_info(&self, committee_id: &str) -> Result<Record, ClientError> {
        let request = self.endpoint.get(&format!("/committee/{}/", committee_id));

        self.first_result(request, "get_committee_info", "Committee not found", |committee| {
            json!({
                "committee_id": pick(committee, "/committee_id"),
                "name": pick(committee, "/name"),
                "designation": pick(committee, "/designation_full"),
                "type": pick(committee, "/committee_type_full"),
                "party": pick(committee, "/party_full"),
                "treasurer_name": pick(committee, "/treasurer_name"),
                "state": pick(committee, "/state"),
                "filing_frequency": pick(committee, "/filing_frequency"),
            })
        })
        .await
    }

    pub async fn get_committee_totals(&self, committee_id: &str, cycle: Option<u16>) -> Result<Record, ClientError> {
        let request = self
            .endpoint
            .get(&format!("/committee/{}/totals/", committee_id))
            .query_opt("cycle", cycle);

        self.first_result(request, "get_committee_totals", "No financial data found", |totals| {
            json!({
                "committee_id": committee_id,
                "cycle": pick(totals, "/cycle"),
                "receipts": amount(totals, "receipts"),
                "disbursements": amount(totals, "disbursements"),
                "cash_on_hand": amount(totals, "cash_on_hand_end_period"),
                "debts": amount(totals, "debts_owed"),
            })
        })
        .await
    }

    /// Itemized committee spending (Schedule B)
    pub async fn get_disbursements(&self, filter: &DisbursementRequest) -> Result<Record, ClientError> {
        tracing::info!("Fetching disbursements for committee {}", filter.committee_id);

        let request = Self::page(self.endpoint.get("/schedules/schedule_b/"), filter.per_page)
            .query("committee_id", &filter.committee_id)
            .query_opt("min_amount", filter.min_amount)
            .query_opt("max_date", filter.max_date.as_deref());

        self.listing(request, "disbursements", "get_disbursements").await
    }

    /// Itemized individual contributions (Schedule A)
    pub async fn search_individual_contributions(&self, search: &ContributionSearch) -> Result<Record, ClientError> {
        let request = Self::page(self.endpoint.get("/schedules/schedule_a/"), search.per_page)
            .query_opt("contributor_name", search.contributor_name.as_deref())
            .query_opt("committee_id", search.committee_id.as_deref())
            .query_opt("min_amount", search.min_amount)
            .query_opt("max_date", search.max_date.as_deref());

        self.listing(request, "contributions", "search_individual_contributions")
            .await
    }
}

/// A dollar figure, 0 when absent
fn amount(totals: &Value, key: &str) -> Value {
    match totals.get(key) {
        Some(Value::Null) | None => json!(0),
        Some(value) => value.clone(),
    }
}

impl Adapter for FecClient {
    fn id(&self) -> &'static str {
        "fec"
    }

    fn name(&self) -> &'static str {
        "Federal Election Commission"
    }

    fn error_mode(&self) -> ErrorMode {
        ErrorMode::Sentinel
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::LOOKUP
    }
}
