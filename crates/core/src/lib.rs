pub mod domain;
pub mod llm;
pub mod time;

pub mod config {
    use crate::llm::adapter::AdapterPolicy;
    use crate::llm::error::AnalysisError;
    use crate::llm::request::PromptProfile;

    const DEFAULT_API_KEY_PREFIX: &str = "AIza";

    /// Process configuration, read once at startup and passed around explicitly.
    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub gemini_api_key: Option<String>,
        /// `Some("")` disables the prefix check.
        pub gemini_api_key_prefix: Option<String>,
        pub gemini_base_url: Option<String>,
        pub gemini_model: Option<String>,
        pub gemini_timeout_secs: Option<u64>,
        pub search_grounding: Option<bool>,
        pub require_non_empty: Option<bool>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                gemini_api_key: std::env::var("GEMINI_API_KEY")
                    .or_else(|_| std::env::var("API_KEY"))
                    .ok(),
                gemini_api_key_prefix: std::env::var("GEMINI_API_KEY_PREFIX").ok(),
                gemini_base_url: std::env::var("GEMINI_BASE_URL").ok(),
                gemini_model: std::env::var("GEMINI_MODEL").ok(),
                gemini_timeout_secs: std::env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok()),
                search_grounding: std::env::var("GEMINI_SEARCH_GROUNDING")
                    .ok()
                    .and_then(|s| parse_flag(&s)),
                require_non_empty: std::env::var("ANALYSIS_REQUIRE_NON_EMPTY")
                    .ok()
                    .and_then(|s| parse_flag(&s)),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        /// Local credential precondition. Never echoes the key itself.
        pub fn require_gemini_api_key(&self) -> Result<&str, AnalysisError> {
            let key = self
                .gemini_api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AnalysisError::Auth {
                    detail: "GEMINI_API_KEY is required".to_string(),
                })?;

            let prefix = self
                .gemini_api_key_prefix
                .as_deref()
                .unwrap_or(DEFAULT_API_KEY_PREFIX);
            if !prefix.is_empty() && !key.starts_with(prefix) {
                return Err(AnalysisError::Auth {
                    detail: format!("GEMINI_API_KEY does not start with the expected prefix {prefix:?}"),
                });
            }

            Ok(key)
        }

        pub fn prompt_profile(&self) -> PromptProfile {
            let mut profile = PromptProfile::default();
            if let Some(enabled) = self.search_grounding {
                profile.search_grounding = enabled;
            }
            profile
        }

        pub fn adapter_policy(&self) -> AdapterPolicy {
            let mut policy = AdapterPolicy::default();
            if let Some(required) = self.require_non_empty {
                policy.require_non_empty = required;
            }
            policy
        }
    }

    fn parse_flag(s: &str) -> Option<bool> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn prefix_check_can_be_disabled() {
            let settings = Settings {
                gemini_api_key: Some("custom-proxy-token".to_string()),
                gemini_api_key_prefix: Some(String::new()),
                ..Default::default()
            };
            assert_eq!(settings.require_gemini_api_key().unwrap(), "custom-proxy-token");
        }

        #[test]
        fn key_is_trimmed() {
            let settings = Settings {
                gemini_api_key: Some("  AIzaKey\n".to_string()),
                ..Default::default()
            };
            assert_eq!(settings.require_gemini_api_key().unwrap(), "AIzaKey");
        }

        #[test]
        fn overrides_flow_into_profile_and_policy() {
            let settings = Settings {
                search_grounding: Some(false),
                require_non_empty: Some(false),
                ..Default::default()
            };
            assert!(!settings.prompt_profile().search_grounding);
            assert!(!settings.adapter_policy().require_non_empty);

            let defaults = Settings::default();
            assert!(defaults.prompt_profile().search_grounding);
            assert!(defaults.adapter_policy().require_non_empty);
        }

        #[test]
        fn parses_common_flag_spellings() {
            assert_eq!(parse_flag("TRUE"), Some(true));
            assert_eq!(parse_flag(" off "), Some(false));
            assert_eq!(parse_flag("maybe"), None);
        }
    }
}
