use crate::domain::recommendation::RiskLevel;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub name: String,
    pub symbol: String,
}

impl Instrument {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
        }
    }
}

/// Per-deployment knobs of the instruction. Fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct PromptProfile {
    pub instruments: Vec<Instrument>,
    pub currency_unit: String,
    pub min_strategies: usize,
    pub search_grounding: bool,
}

impl Default for PromptProfile {
    fn default() -> Self {
        Self {
            instruments: vec![
                Instrument::new("دلار بازار آزاد", "USD"),
                Instrument::new("تتر", "USDT"),
                Instrument::new("سکه امامی", "EMAMI"),
                Instrument::new("طلای ۱۸ عیار (هر گرم)", "GOLD18"),
            ],
            currency_unit: "تومان".to_string(),
            min_strategies: 3,
            search_grounding: true,
        }
    }
}

/// Everything the external call needs besides credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub instruction: String,
    pub response_schema: serde_json::Value,
    pub search_grounding: bool,
}

impl AnalysisRequest {
    pub fn build(profile: &PromptProfile) -> Self {
        Self {
            instruction: instruction(profile),
            response_schema: response_schema(),
            search_grounding: profile.search_grounding,
        }
    }
}

fn instruction(profile: &PromptProfile) -> String {
    let instruments = profile
        .instruments
        .iter()
        .map(|i| format!("{} ({})", i.name, i.symbol))
        .collect::<Vec<_>>()
        .join("، ");
    let currency = &profile.currency_unit;

    [
        "به عنوان یک تحلیلگر خبره بازار ایران:".to_string(),
        format!("۱. قیمت لحظه‌ای این دارایی‌ها را به {currency} پیدا کن: {instruments}."),
        "۲. وضعیت فعلی بازار را در ۳ خط بسیار کوتاه تحلیل کن و حباب قیمتی و فرصت‌های آربیتراژ بین این دارایی‌ها را بررسی کن.".to_string(),
        format!(
            "۳. حداقل {} استراتژی جابجایی هوشمند بین این دارایی‌ها پیشنهاد بده.",
            profile.min_strategies
        ),
        format!("همه متن‌ها به زبان فارسی و همه قیمت‌ها به {currency} باشد."),
        "میزان اطمینان (confidence) را به صورت درصد بین ۰ تا ۱۰۰ بده.".to_string(),
        "پاسخ حتما فقط یک شیء JSON مطابق اسکیمای داده شده باشد.".to_string(),
    ]
    .join("\n")
}

/// Output schema in the Gemini OpenAPI subset. `sources` is absent on purpose:
/// citations arrive out-of-band as grounding metadata.
pub fn response_schema() -> serde_json::Value {
    let risk_levels: Vec<&str> = RiskLevel::ALL.iter().map(|r| r.as_str()).collect();

    serde_json::json!({
        "type": "OBJECT",
        "required": ["overview", "prices", "strategies"],
        "properties": {
            "overview": {"type": "STRING"},
            "prices": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "required": ["name", "symbol", "price", "change", "isPositive"],
                    "properties": {
                        "name": {"type": "STRING"},
                        "symbol": {"type": "STRING"},
                        "price": {"type": "STRING"},
                        "change": {"type": "STRING"},
                        "isPositive": {"type": "BOOLEAN"}
                    }
                }
            },
            "strategies": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "required": [
                        "title",
                        "pair",
                        "logic",
                        "technicalAnalysis",
                        "fundamentalAnalysis",
                        "riskLevel",
                        "confidence"
                    ],
                    "properties": {
                        "title": {"type": "STRING"},
                        "pair": {"type": "STRING"},
                        "logic": {"type": "STRING"},
                        "technicalAnalysis": {"type": "STRING"},
                        "fundamentalAnalysis": {"type": "STRING"},
                        "riskLevel": {"type": "STRING", "enum": risk_levels},
                        "confidence": {"type": "NUMBER"},
                        "potentialProfit": {"type": "STRING"}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn required(v: &Value) -> Vec<&str> {
        v["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect()
    }

    #[test]
    fn schema_marks_root_keys_required() {
        let schema = response_schema();
        assert_eq!(required(&schema), ["overview", "prices", "strategies"]);
        assert!(schema["properties"].get("sources").is_none());
    }

    #[test]
    fn schema_constrains_items() {
        let schema = response_schema();
        let price = &schema["properties"]["prices"]["items"];
        assert_eq!(
            required(price),
            ["name", "symbol", "price", "change", "isPositive"]
        );

        let strategy = &schema["properties"]["strategies"]["items"];
        let strategy_required = required(strategy);
        for key in [
            "title",
            "pair",
            "logic",
            "technicalAnalysis",
            "fundamentalAnalysis",
            "riskLevel",
            "confidence",
        ] {
            assert!(strategy_required.contains(&key), "{key} must be required");
        }
        assert!(!strategy_required.contains(&"potentialProfit"));
        assert_eq!(
            strategy["properties"]["riskLevel"]["enum"],
            json!(["LOW", "MEDIUM", "HIGH"])
        );
    }

    #[test]
    fn default_request_names_every_instrument_and_enables_search() {
        let profile = PromptProfile::default();
        let request = AnalysisRequest::build(&profile);
        assert!(request.search_grounding);
        for instrument in &profile.instruments {
            assert!(request.instruction.contains(&instrument.name));
            assert!(request.instruction.contains(&instrument.symbol));
        }
        assert!(request.instruction.contains("تومان"));
        assert!(request.instruction.contains("حداقل 3"));
    }
}
