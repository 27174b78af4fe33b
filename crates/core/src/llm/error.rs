use serde::Serialize;
use std::fmt;

// Matched case-insensitively against the transport's error text. Only consulted
// when the structured status did not already decide the kind.
const CREDENTIAL_MARKERS: &[&str] = &["api key not valid", "api_key_invalid"];
const QUOTA_MARKERS: &[&str] = &["429", "quota", "resource_exhausted"];

/// Stable tag the presentation layer switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    AuthError,
    RateLimited,
    EmptyResponse,
    MalformedResponse,
    IncompleteData,
    TransportError,
}

#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Credential missing, malformed, or rejected upstream.
    Auth { detail: String },
    RateLimited {
        retry_after_secs: Option<u64>,
        detail: String,
    },
    EmptyResponse { detail: String },
    MalformedResponse {
        detail: String,
        raw_output: Option<String>,
    },
    IncompleteData { detail: String },
    Transport { message: String },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Auth { .. } => ErrorKind::AuthError,
            AnalysisError::RateLimited { .. } => ErrorKind::RateLimited,
            AnalysisError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            AnalysisError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            AnalysisError::IncompleteData { .. } => ErrorKind::IncompleteData,
            AnalysisError::Transport { .. } => ErrorKind::TransportError,
        }
    }

    /// Message shown verbatim by the dashboard (Persian).
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Auth { .. } => {
                "کلید دسترسی سرویس هوش مصنوعی نامعتبر است یا تنظیم نشده است. لطفا پیکربندی کلید را بررسی کنید."
                    .to_string()
            }
            AnalysisError::RateLimited { .. } => {
                "سهمیه استفاده از هوش مصنوعی موقتا به پایان رسیده است. لطفا چند دقیقه صبر کنید و دوباره تلاش کنید."
                    .to_string()
            }
            AnalysisError::EmptyResponse { .. } => "پاسخی از هوش مصنوعی دریافت نشد.".to_string(),
            AnalysisError::MalformedResponse { .. } => {
                "پاسخ هوش مصنوعی در قالب مورد انتظار نبود. لطفا دوباره تلاش کنید.".to_string()
            }
            AnalysisError::IncompleteData { .. } => {
                "اطلاعات دریافتی از هوش مصنوعی ناقص است. لطفا دوباره تلاش کنید.".to_string()
            }
            AnalysisError::Transport { message } => {
                format!("خطای سیستمی در دریافت داده‌ها: {message}")
            }
        }
    }

    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AnalysisError::MalformedResponse { raw_output, .. } => raw_output.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::Auth { detail } => write!(f, "credential rejected: {detail}"),
            AnalysisError::RateLimited {
                retry_after_secs: Some(secs),
                detail,
            } => write!(f, "rate limited (retry after {secs}s): {detail}"),
            AnalysisError::RateLimited { detail, .. } => write!(f, "rate limited: {detail}"),
            AnalysisError::EmptyResponse { detail } => write!(f, "empty response: {detail}"),
            AnalysisError::MalformedResponse { detail, .. } => {
                write!(f, "malformed response: {detail}")
            }
            AnalysisError::IncompleteData { detail } => write!(f, "incomplete data: {detail}"),
            AnalysisError::Transport { message } => write!(f, "transport error: {message}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Classifies a failed external call.
///
/// The structured HTTP status wins when it is conclusive; otherwise the message
/// is scanned for known markers. Anything unrecognised stays a transport error.
pub fn classify_failure(
    status: Option<u16>,
    retry_after_secs: Option<u64>,
    message: impl Into<String>,
) -> AnalysisError {
    let message = message.into();
    match status {
        Some(401) | Some(403) => return AnalysisError::Auth { detail: message },
        Some(429) => {
            return AnalysisError::RateLimited {
                retry_after_secs,
                detail: message,
            }
        }
        _ => {}
    }

    let lower = message.to_ascii_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return AnalysisError::Auth { detail: message };
    }
    if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        return AnalysisError::RateLimited {
            retry_after_secs,
            detail: message,
        };
    }

    AnalysisError::Transport { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_take_precedence() {
        assert_eq!(classify_failure(Some(401), None, "x").kind(), ErrorKind::AuthError);
        assert_eq!(classify_failure(Some(403), None, "x").kind(), ErrorKind::AuthError);
        let err = classify_failure(Some(429), Some(30), "slow down");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(matches!(
            err,
            AnalysisError::RateLimited {
                retry_after_secs: Some(30),
                ..
            }
        ));
    }

    #[test]
    fn message_markers_classify_without_status() {
        let err = classify_failure(None, None, "Quota exceeded for metric generate_content");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        let err = classify_failure(Some(400), None, "INVALID_ARGUMENT: API key not valid. Please pass a valid API key.");
        assert_eq!(err.kind(), ErrorKind::AuthError);
        let err = classify_failure(None, None, "got status 429 from upstream");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn unknown_failures_stay_transport_errors() {
        let err = classify_failure(Some(500), None, "INTERNAL: backend error");
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(err.user_message().contains("INTERNAL: backend error"));
        let err = classify_failure(None, None, "connection reset by peer");
        assert_eq!(err.kind(), ErrorKind::TransportError);
    }

    #[test]
    fn rate_limited_message_asks_user_to_wait() {
        let err = classify_failure(Some(429), None, "RESOURCE_EXHAUSTED");
        assert!(err.user_message().contains("صبر کنید"));
    }

    #[test]
    fn kind_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MalformedResponse).unwrap();
        assert_eq!(json, "\"MALFORMED_RESPONSE\"");
    }
}
