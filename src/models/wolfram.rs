//! Wolfram|Alpha computation result.

use serde::{Deserialize, Serialize};

use super::ResultRecord;

/// Which Wolfram|Alpha API produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Text,
    Image,
    Spoken,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subpod {
    pub title: String,
    pub plaintext: String,
}

/// One titled section of a full query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub title: Option<String>,
    pub id: Option<String>,
    pub position: Option<i64>,
    pub subpods: Vec<Subpod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WolframResult {
    pub success: bool,

    pub query: String,

    pub result: Option<String>,

    pub result_type: ResultType,

    /// Only set for full queries
    pub pods: Option<Vec<Pod>>,

    pub error: Option<String>,
}

impl ResultRecord for WolframResult {}

impl WolframResult {
    pub fn answered(query: impl Into<String>, result: impl Into<String>, result_type: ResultType) -> Self {
        Self {
            success: true,
            query: query.into(),
            result: Some(result.into()),
            result_type,
            pods: None,
            error: None,
        }
    }

    pub fn unanswered(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.into(),
            result: None,
            result_type: ResultType::Text,
            pods: None,
            error: Some(error.into()),
        }
    }
}
