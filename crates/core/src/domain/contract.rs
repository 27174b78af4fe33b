use crate::domain::market::{AnalysisResult, PriceQuote, SourceCitation};
use crate::domain::recommendation::{normalize_confidence, RiskLevel, StrategyRecommendation};
use crate::llm::error::AnalysisError;
use serde::Deserialize;

/// Analysis payload exactly as the model emits it.
///
/// The three top-level collections are optional here so a missing key can be
/// told apart from a type violation: the former is incomplete data, the latter
/// already fails deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    #[serde(default, alias = "marketOverview")]
    pub overview: Option<String>,
    #[serde(default)]
    pub prices: Option<Vec<LlmPriceQuote>>,
    #[serde(default)]
    pub strategies: Option<Vec<LlmStrategy>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmPriceQuote {
    pub name: String,
    pub symbol: String,
    pub price: String,
    pub change: String,
    pub is_positive: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStrategy {
    pub title: String,
    pub pair: String,
    pub logic: String,
    pub technical_analysis: String,
    pub fundamental_analysis: String,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    #[serde(default)]
    pub potential_profit: Option<String>,
}

fn incomplete(detail: impl Into<String>) -> AnalysisError {
    AnalysisError::IncompleteData {
        detail: detail.into(),
    }
}

impl LlmAnalysis {
    pub fn validate_and_into_result(
        self,
        require_non_empty: bool,
        sources: Vec<SourceCitation>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let overview = self
            .overview
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| incomplete("overview is missing"))?;
        let prices = self.prices.ok_or_else(|| incomplete("prices is missing"))?;
        let strategies = self
            .strategies
            .ok_or_else(|| incomplete("strategies is missing"))?;

        if require_non_empty {
            if prices.is_empty() {
                return Err(incomplete("prices must not be empty"));
            }
            if strategies.is_empty() {
                return Err(incomplete("strategies must not be empty"));
            }
        }

        let prices = prices
            .into_iter()
            .enumerate()
            .map(|(idx, p)| p.validate_and_into_quote(idx))
            .collect::<Result<Vec<_>, _>>()?;
        let strategies = strategies
            .into_iter()
            .enumerate()
            .map(|(idx, s)| s.validate_and_into_strategy(idx))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AnalysisResult {
            overview,
            prices,
            strategies,
            sources,
        })
    }
}

impl LlmPriceQuote {
    fn validate_and_into_quote(self, idx: usize) -> Result<PriceQuote, AnalysisError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(incomplete(format!("prices[{idx}].name must be non-empty")));
        }
        let price = self.price.trim().to_string();
        if price.is_empty() {
            return Err(incomplete(format!("prices[{idx}].price must be non-empty")));
        }

        Ok(PriceQuote {
            name,
            symbol: self.symbol.trim().to_string(),
            price,
            change: self.change.trim().to_string(),
            is_positive: self.is_positive,
        })
    }
}

impl LlmStrategy {
    fn validate_and_into_strategy(
        self,
        idx: usize,
    ) -> Result<StrategyRecommendation, AnalysisError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(incomplete(format!(
                "strategies[{idx}].title must be non-empty"
            )));
        }
        let pair = self.pair.trim().to_string();
        if pair.is_empty() {
            return Err(incomplete(format!(
                "strategies[{idx}].pair must be non-empty"
            )));
        }

        let potential_profit = self
            .potential_profit
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(StrategyRecommendation {
            title,
            pair,
            logic: self.logic.trim().to_string(),
            technical_analysis: self.technical_analysis.trim().to_string(),
            fundamental_analysis: self.fundamental_analysis.trim().to_string(),
            risk_level: self.risk_level,
            confidence: normalize_confidence(self.confidence),
            potential_profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::ErrorKind;
    use serde_json::json;

    fn strategy(confidence: serde_json::Value) -> serde_json::Value {
        json!({
            "title": "  خروج از دلار  ",
            "pair": "دلار → طلا",
            "logic": "حباب دلار بالاست",
            "technicalAnalysis": "مقاومت ۶۰ هزار",
            "fundamentalAnalysis": "تورم پایه",
            "riskLevel": "MEDIUM",
            "confidence": confidence,
        })
    }

    fn analysis(prices: serde_json::Value, strategies: serde_json::Value) -> LlmAnalysis {
        serde_json::from_value(json!({
            "overview": "بازار در حالت انتظار است",
            "prices": prices,
            "strategies": strategies,
        }))
        .unwrap()
    }

    #[test]
    fn normalizes_and_trims_strategies() {
        let parsed = analysis(json!([]), json!([strategy(json!(0.92)), strategy(json!(85))]));
        let result = parsed.validate_and_into_result(false, Vec::new()).unwrap();
        assert_eq!(result.strategies[0].title, "خروج از دلار");
        assert_eq!(result.strategies[0].confidence, 92);
        assert_eq!(result.strategies[1].confidence, 85);
        assert_eq!(result.strategies[0].potential_profit, None);
    }

    #[test]
    fn accepts_legacy_market_overview_key() {
        let parsed: LlmAnalysis = serde_json::from_value(json!({
            "marketOverview": "خلاصه",
            "prices": [],
            "strategies": [],
        }))
        .unwrap();
        let result = parsed.validate_and_into_result(false, Vec::new()).unwrap();
        assert_eq!(result.overview, "خلاصه");
    }

    #[test]
    fn missing_collection_is_incomplete() {
        let parsed: LlmAnalysis = serde_json::from_value(json!({
            "overview": "خلاصه",
            "prices": [],
        }))
        .unwrap();
        let err = parsed.validate_and_into_result(false, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteData);
    }

    #[test]
    fn empty_collections_depend_on_policy() {
        let lenient = analysis(json!([]), json!([strategy(json!(0.5))]));
        assert!(lenient.validate_and_into_result(false, Vec::new()).is_ok());

        let strict = analysis(json!([]), json!([strategy(json!(0.5))]));
        let err = strict.validate_and_into_result(true, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteData);
    }

    #[test]
    fn blank_strategy_title_is_rejected() {
        let mut bad = strategy(json!(0.5));
        bad["title"] = json!("   ");
        let parsed = analysis(json!([]), json!([bad]));
        let err = parsed.validate_and_into_result(false, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteData);
    }

    #[test]
    fn unknown_risk_level_fails_deserialization() {
        let mut bad = strategy(json!(0.5));
        bad["riskLevel"] = json!("EXTREME");
        let res = serde_json::from_value::<LlmAnalysis>(json!({
            "overview": "x",
            "prices": [],
            "strategies": [bad],
        }));
        assert!(res.is_err());
    }
}
