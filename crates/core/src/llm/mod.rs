pub mod adapter;
pub mod error;
pub mod gemini;
pub mod json;
pub mod request;

use crate::domain::market::AnalysisResult;
use crate::llm::error::AnalysisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
        }
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// One fetch cycle: build the request, call out, adapt the reply.
    async fn fetch_analysis(&self) -> Result<AnalysisResult, AnalysisError>;
}
