use crate::domain::market::{AnalysisResult, SourceCitation};
use crate::llm::error::AnalysisError;
use crate::llm::json;
use serde::Deserialize;

pub const MAX_SOURCES: usize = 4;

/// Title used when a grounding reference carries none ("news source").
pub const DEFAULT_SOURCE_TITLE: &str = "منبع خبر";

/// Provider-neutral view of a model reply: the textual payload plus any
/// search-grounding references that came with it.
#[derive(Debug, Clone, Default)]
pub struct RawReply {
    pub text: Option<String>,
    pub grounding: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebReference {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct AdapterPolicy {
    /// Reject replies whose `prices` or `strategies` arrays are empty.
    pub require_non_empty: bool,
}

impl Default for AdapterPolicy {
    fn default() -> Self {
        Self {
            require_non_empty: true,
        }
    }
}

/// Turns a raw reply into an [`AnalysisResult`] or a classified failure.
pub fn adapt(reply: RawReply, policy: AdapterPolicy) -> Result<AnalysisResult, AnalysisError> {
    let Some(text) = reply.text.filter(|t| !t.trim().is_empty()) else {
        return Err(AnalysisError::EmptyResponse {
            detail: "reply carried no text payload".to_string(),
        });
    };

    let parsed = json::parse_payload(&text)?;
    let sources = extract_sources(&reply.grounding);
    let result = parsed.validate_and_into_result(policy.require_non_empty, sources)?;

    tracing::debug!(
        prices = result.prices.len(),
        strategies = result.strategies.len(),
        sources = result.sources.len(),
        "adapted analysis reply"
    );
    Ok(result)
}

/// Keeps web references with a usable URI, in order, capped at [`MAX_SOURCES`].
pub fn extract_sources(chunks: &[GroundingChunk]) -> Vec<SourceCitation> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_SOURCE_TITLE);
            Some(SourceCitation {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .take(MAX_SOURCES)
        .collect()
}
