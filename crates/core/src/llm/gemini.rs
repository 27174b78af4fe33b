use crate::config::Settings;
use crate::domain::market::AnalysisResult;
use crate::llm::adapter::{self, AdapterPolicy, GroundingChunk, RawReply};
use crate::llm::error::{classify_failure, AnalysisError};
use crate::llm::request::{AnalysisRequest, PromptProfile};
use crate::llm::{LlmClient, Provider};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    headers: HeaderMap,
    base_url: String,
    model: String,
    profile: PromptProfile,
    policy: AdapterPolicy,
}

impl GeminiClient {
    /// Fails with [`AnalysisError::Auth`] before any network activity when the
    /// configured credential is unusable.
    pub fn from_settings(settings: &Settings) -> Result<Self, AnalysisError> {
        let api_key = settings.require_gemini_api_key()?;

        let mut headers = HeaderMap::new();
        let mut key_value = HeaderValue::from_str(api_key).map_err(|_| AnalysisError::Auth {
            detail: "GEMINI_API_KEY contains characters not allowed in a header".to_string(),
        })?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let base_url = settings
            .gemini_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = settings.gemini_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Transport {
                message: format!("failed to build reqwest client: {e}"),
            })?;

        Ok(Self {
            http,
            headers,
            base_url,
            model,
            profile: settings.prompt_profile(),
            policy: settings.adapter_policy(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_body(request: AnalysisRequest) -> GenerateContentRequest {
        let tools = if request.search_grounding {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart {
                    text: request.instruction,
                }],
            }],
            tools,
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
                response_schema: request.response_schema,
            },
        }
    }

    async fn generate_content(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<(serde_json::Value, GenerateContentResponse), AnalysisError> {
        let res = self
            .http
            .post(self.url())
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = res.status();
        if !status.is_success() {
            let retry_after_secs = res
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            let text = res.text().await.unwrap_or_default();
            return Err(classify_failure(
                Some(status.as_u16()),
                retry_after_secs,
                error_message(status, &text),
            ));
        }

        let text = res.text().await.map_err(transport_error)?;
        let raw_json = serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
            AnalysisError::MalformedResponse {
                detail: format!("failed to parse Gemini response envelope: {e}"),
                raw_output: Some(text.clone()),
            }
        })?;
        let parsed = serde_json::from_value::<GenerateContentResponse>(raw_json.clone())
            .map_err(|e| AnalysisError::MalformedResponse {
                detail: format!("failed to decode Gemini response envelope: {e}"),
                raw_output: Some(text.clone()),
            })?;
        Ok((raw_json, parsed))
    }

    /// Like [`LlmClient::fetch_analysis`] but also returns the raw envelope.
    pub async fn fetch_analysis_with_raw(
        &self,
    ) -> Result<(AnalysisResult, serde_json::Value), AnalysisError> {
        let request = AnalysisRequest::build(&self.profile);
        tracing::info!(
            model = %self.model,
            search_grounding = request.search_grounding,
            "requesting market analysis"
        );

        let body = Self::build_body(request);
        let (raw_json, res) = self.generate_content(&body).await?;
        let reply = into_raw_reply(res)?;
        let result = adapter::adapt(reply, self.policy)?;
        Ok((result, raw_json))
    }
}

#[async_trait::async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn fetch_analysis(&self) -> Result<AnalysisResult, AnalysisError> {
        let (result, _raw) = self.fetch_analysis_with_raw().await?;
        Ok(result)
    }
}

fn transport_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        return AnalysisError::Transport {
            message: format!("Gemini request timed out: {err}"),
        };
    }
    classify_failure(
        err.status().map(|s| s.as_u16()),
        None,
        format!("Gemini request failed: {err}"),
    )
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "status={status}: {} {}",
            envelope.error.status.unwrap_or_default(),
            envelope.error.message.unwrap_or_default()
        )
        .trim_end()
        .to_string(),
        Err(_) => format!("status={status}: {body}"),
    }
}

/// First candidate only, as the SDK's `response.text` does. Thought parts are skipped.
fn into_raw_reply(res: GenerateContentResponse) -> Result<RawReply, AnalysisError> {
    let Some(candidate) = res.candidates.into_iter().next() else {
        let detail = match res.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => format!("no candidates (blockReason={reason})"),
            None => "no candidates".to_string(),
        };
        return Err(AnalysisError::EmptyResponse { detail });
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" {
            tracing::warn!(finish_reason = reason, "Gemini candidate did not finish normally");
        }
    }

    let mut text = String::new();
    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    for part in parts {
        if part.thought.unwrap_or(false) {
            continue;
        }
        if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    let grounding = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default();

    Ok(RawReply {
        text: (!text.is_empty()).then_some(text),
        grounding,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}
