use crate::domain::recommendation::StrategyRecommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub name: String,
    pub symbol: String,
    pub price: String,
    pub change: String,
    pub is_positive: bool,
}

/// Web reference backing the analysis, taken from search grounding metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overview: String,
    pub prices: Vec<PriceQuote>,
    pub strategies: Vec<StrategyRecommendation>,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
}

/// A result as held between fetch cycles, stamped with when it was fetched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub fetch_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub updated_label: String,
    pub result: AnalysisResult,
}

impl AnalysisSnapshot {
    pub fn new(result: AnalysisResult, fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetch_id: Uuid::new_v4(),
            fetched_at,
            updated_label: crate::time::tehran::update_label(fetched_at),
            result,
        }
    }
}
