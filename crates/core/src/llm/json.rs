use crate::domain::contract::LlmAnalysis;
use crate::llm::error::AnalysisError;

/// Strips a surrounding Markdown fence (```json ... ``` or ``` ... ```).
/// Anything else is returned trimmed but otherwise untouched.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let mut inner = trimmed;
    if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
        inner = after_first;
    }
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim()
}

/// Strict JSON parse of the model payload into the raw analysis contract.
pub fn parse_payload(text: &str) -> Result<LlmAnalysis, AnalysisError> {
    let json_str = strip_code_fence(text);
    let value = serde_json::from_str::<serde_json::Value>(json_str).map_err(|e| {
        AnalysisError::MalformedResponse {
            detail: format!("payload is not valid JSON: {e}"),
            raw_output: Some(text.to_string()),
        }
    })?;
    if !value.is_object() {
        return Err(AnalysisError::MalformedResponse {
            detail: "payload root must be a JSON object".to_string(),
            raw_output: Some(text.to_string()),
        });
    }

    serde_json::from_value::<LlmAnalysis>(value).map_err(|e| AnalysisError::MalformedResponse {
        detail: format!("payload does not match the analysis schema: {e}"),
        raw_output: Some(text.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::error::ErrorKind;

    #[test]
    fn strip_code_fence_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(strip_code_fence(&fenced), body);
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  {\"a\":1}\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("prefix {\"a\":1}"), "prefix {\"a\":1}");
    }

    #[test]
    fn parse_payload_rejects_invalid_json() {
        let err = parse_payload("{not valid json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert_eq!(err.raw_output(), Some("{not valid json"));
    }

    #[test]
    fn parse_payload_rejects_non_object_root() {
        for text in ["[1, 2, 3]", "[]", "\"overview\"", "null"] {
            let err = parse_payload(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedResponse, "{text}");
        }
    }

    #[test]
    fn parse_payload_accepts_fenced_object() {
        let text = "```json\n{\"overview\": \"x\", \"prices\": [], \"strategies\": []}\n```";
        let parsed = parse_payload(text).unwrap();
        assert_eq!(parsed.overview.as_deref(), Some("x"));
        assert_eq!(parsed.prices.map(|p| p.len()), Some(0));
    }
}
