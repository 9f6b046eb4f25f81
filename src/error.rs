use std::time::Duration;

/// Everything that can go wrong between receiving a snapshot and handing back
/// feedback text.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Carries the client-side limit when it was our timer that fired.
    #[error("request timed out{}", .0.map(|d| format!(" after {:?}", d)).unwrap_or_default())]
    Timeout(Option<Duration>),

    #[error("network error: {0}")]
    Network(String),

    #[error("backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model not available: {0}")]
    ModelUnavailable(String),

    #[error("no feedback generated from backend")]
    EmptyCompletion,

    #[error("invalid performance snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("stream error: {0}")]
    Stream(String),
}

impl FeedbackError {
    /// Maps a non-success HTTP response from the backend onto an error class.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_api_message(body);
        match status {
            401 | 403 => FeedbackError::Configuration(message),
            429 if body.contains("insufficient_quota") => FeedbackError::QuotaExhausted(message),
            429 => FeedbackError::RateLimited(message),
            404 if body.contains("model_not_found") || message.contains("model") => {
                FeedbackError::ModelUnavailable(message)
            }
            408 | 504 => FeedbackError::Timeout(None),
            _ => FeedbackError::Api { status, message },
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            FeedbackError::Timeout(Some(timeout))
        } else if err.is_connect() || err.is_request() {
            FeedbackError::Network(err.to_string())
        } else if err.is_decode() {
            FeedbackError::Api {
                status: 200,
                message: format!("malformed response: {}", err),
            }
        } else if let Some(status) = err.status() {
            FeedbackError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FeedbackError::Network(err.to_string())
        }
    }

    /// Short message safe to show to the person who requested the feedback.
    ///
    /// Generic backend and stream errors are classified by what their message
    /// says, since proxies and compatible servers do not always pick a status
    /// code that matches the symptom.
    pub fn user_message(&self) -> String {
        let text = match self {
            FeedbackError::Configuration(_) => MSG_CREDENTIAL,
            FeedbackError::RateLimited(_) => MSG_RATE_LIMITED,
            FeedbackError::QuotaExhausted(_) => MSG_QUOTA,
            FeedbackError::Timeout(_) => MSG_TIMEOUT,
            FeedbackError::Network(_) => MSG_NETWORK,
            FeedbackError::ModelUnavailable(_) => MSG_MODEL,
            FeedbackError::EmptyCompletion => {
                return "AI generation error: No feedback generated from AI".to_string()
            }
            FeedbackError::InvalidSnapshot(reason) => {
                return format!("Invalid performance data: {}", reason)
            }
            FeedbackError::Api { message, .. } | FeedbackError::Stream(message) => {
                match symptom_message(message) {
                    Some(text) => text,
                    None => return format!("AI generation error: {}", message),
                }
            }
        };
        text.to_string()
    }
}

const MSG_CREDENTIAL: &str = "API key not configured or invalid. Please check your API key.";
const MSG_RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";
const MSG_QUOTA: &str = "Generation quota exceeded. Please check your usage limits.";
const MSG_TIMEOUT: &str = "Request timed out. Please try again.";
const MSG_NETWORK: &str = "Network error. Please check your connection and try again.";
const MSG_MODEL: &str = "Model not available. Please try again later.";

fn symptom_message(message: &str) -> Option<&'static str> {
    let lower = message.to_ascii_lowercase();
    let has = |needle: &str| lower.contains(needle);
    if has("api key") || has("unauthorized") {
        Some(MSG_CREDENTIAL)
    } else if has("insufficient_quota") {
        Some(MSG_QUOTA)
    } else if has("rate limit") || has("quota") {
        Some(MSG_RATE_LIMITED)
    } else if has("timeout") || has("timed out") {
        Some(MSG_TIMEOUT)
    } else if has("network") || has("fetch") {
        Some(MSG_NETWORK)
    } else if has("model_not_found") {
        Some(MSG_MODEL)
    } else {
        None
    }
}

/// Decides whether a failed attempt is worth repeating.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FeedbackError {
    fn is_retryable(&self) -> bool {
        match self {
            FeedbackError::RateLimited(_)
            | FeedbackError::QuotaExhausted(_)
            | FeedbackError::Timeout(_)
            | FeedbackError::Network(_)
            | FeedbackError::Stream(_) => true,
            FeedbackError::Api { message, .. } => !names_credential_problem(message),
            FeedbackError::Configuration(_)
            | FeedbackError::ModelUnavailable(_)
            | FeedbackError::EmptyCompletion
            | FeedbackError::InvalidSnapshot(_) => false,
        }
    }
}

/// True when an error message points at a bad credential or a malformed
/// argument, neither of which a retry can fix.
pub fn names_credential_problem(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("api key") || lower.contains("unauthorized") || lower.contains("invalid")
}

// OpenAI-style bodies look like {"error": {"message": "..."}}.
fn extract_api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got `{value}`")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            FeedbackError::from_status(401, r#"{"error":{"message":"Incorrect API key"}}"#),
            FeedbackError::Configuration(m) if m == "Incorrect API key"
        ));
        assert!(matches!(
            FeedbackError::from_status(429, r#"{"error":{"code":"insufficient_quota","message":"quota"}}"#),
            FeedbackError::QuotaExhausted(_)
        ));
        assert!(matches!(
            FeedbackError::from_status(429, "slow down"),
            FeedbackError::RateLimited(_)
        ));
        assert!(matches!(
            FeedbackError::from_status(404, r#"{"error":{"code":"model_not_found","message":"nope"}}"#),
            FeedbackError::ModelUnavailable(_)
        ));
        assert!(matches!(
            FeedbackError::from_status(503, "overloaded"),
            FeedbackError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn retry_classification() {
        assert!(FeedbackError::Network("reset".into()).is_retryable());
        assert!(FeedbackError::Timeout(Some(Duration::from_secs(1))).is_retryable());
        assert!(!FeedbackError::Configuration("missing".into()).is_retryable());
        assert!(!FeedbackError::EmptyCompletion.is_retryable());
        assert!(!FeedbackError::Api {
            status: 500,
            message: "Invalid API key provided".into()
        }
        .is_retryable());
        assert!(FeedbackError::Api {
            status: 400,
            message: "context too long".into()
        }
        .is_retryable());
        assert!(!FeedbackError::Api {
            status: 400,
            message: "Invalid value for 'temperature'".into()
        }
        .is_retryable());
        assert!(FeedbackError::Api {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
    }

    #[test]
    fn user_messages_are_classified() {
        assert_eq!(
            FeedbackError::RateLimited("x".into()).user_message(),
            "Rate limit exceeded. Please try again later."
        );
        assert!(FeedbackError::Api {
            status: 500,
            message: "boom".into()
        }
        .user_message()
        .ends_with("boom"));
    }

    #[test]
    fn generic_errors_are_classified_by_message() {
        let api = |message: &str| FeedbackError::Api {
            status: 500,
            message: message.to_string(),
        };
        assert_eq!(
            api("Incorrect API key provided: sk-xx").user_message(),
            "API key not configured or invalid. Please check your API key."
        );
        assert_eq!(
            api("upstream request timeout").user_message(),
            "Request timed out. Please try again."
        );
        assert_eq!(
            api("Rate limit reached for requests").user_message(),
            "Rate limit exceeded. Please try again later."
        );
        assert_eq!(
            api("fetch failed").user_message(),
            "Network error. Please check your connection and try again."
        );
        assert_eq!(
            FeedbackError::Stream("model_not_found".into()).user_message(),
            "Model not available. Please try again later."
        );
        assert_eq!(api("boom").user_message(), "AI generation error: boom");
    }

    #[test]
    fn timeout_display_names_the_limit_when_known() {
        assert_eq!(
            FeedbackError::Timeout(Some(Duration::from_secs(60))).to_string(),
            "request timed out after 60s"
        );
        assert_eq!(FeedbackError::Timeout(None).to_string(), "request timed out");
        assert!(matches!(
            FeedbackError::from_status(504, "gateway timeout"),
            FeedbackError::Timeout(None)
        ));
    }
}
