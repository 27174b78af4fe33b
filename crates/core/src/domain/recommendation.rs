use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One suggested conversion between two instruments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecommendation {
    pub title: String,
    /// Human-readable "from -> to" description, e.g. "تبدیل دلار به طلا".
    pub pair: String,
    pub logic: String,
    pub technical_analysis: String,
    pub fundamental_analysis: String,
    pub risk_level: RiskLevel,
    /// Integer percentage, see [`normalize_confidence`].
    pub confidence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potential_profit: Option<String>,
}

/// Maps a model-reported confidence onto a 0..=100 style percentage.
///
/// The model is inconsistent about scale: values `<= 1` are fractions and get
/// multiplied by 100, anything above 1 is already a percentage. Negative input
/// clamps to 0; values above 100 are kept as reported.
pub fn normalize_confidence(raw: f64) -> u32 {
    let percent = if raw <= 1.0 { raw * 100.0 } else { raw };
    // `as` saturates, and NaN becomes 0.
    percent.round().max(0.0) as u32
}
