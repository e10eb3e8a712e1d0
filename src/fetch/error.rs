//! Failure taxonomy for page fetches.
//!
//! Every upstream failure is classified into one of four variants at the
//! source boundary, so the retry decision is a match rather than string
//! inspection further down.

use serde::Deserialize;
use thiserror::Error;

/// Error code the Admin API attaches to throttled GraphQL responses.
pub const THROTTLED_CODE: &str = "THROTTLED";

/// Why a single page request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Upstream asked us to slow down.
    #[error("throttled by upstream: {0}")]
    Throttled(String),

    /// Connection, timeout or server-side failure.
    #[error("network failure: {0}")]
    Network(String),

    /// The response did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Schema(String),

    /// Upstream rejected the request.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl FetchError {
    /// Throttling and network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Throttled(_) | FetchError::Network(_))
    }
}

/// A GraphQL error entry from a response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphQlErrorExtensions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphQlError {
    fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|e| e.code.as_deref())
    }

    /// True when the error says the request was throttled.
    ///
    /// The structured `extensions.code` is authoritative. Older API
    /// versions only put "Throttled" in the message, so that is matched
    /// case-insensitively as a fallback.
    pub fn is_throttle(&self) -> bool {
        match self.code() {
            Some(code) => code.eq_ignore_ascii_case(THROTTLED_CODE),
            None => self.message.to_ascii_lowercase().contains("throttled"),
        }
    }
}

/// Classify the `errors` array of a GraphQL response.
///
/// Any throttle entry makes the whole response retryable; otherwise the
/// messages are joined into a non-retryable API error.
pub fn classify_graphql_errors(errors: &[GraphQlError]) -> FetchError {
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .filter(|m| !m.is_empty())
        .collect::<Vec<_>>()
        .join("; ");

    if errors.iter().any(GraphQlError::is_throttle) {
        FetchError::Throttled(message)
    } else {
        FetchError::Api {
            status: 200,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(message: &str, code: Option<&str>) -> GraphQlError {
        GraphQlError {
            message: message.to_string(),
            extensions: code.map(|c| GraphQlErrorExtensions {
                code: Some(c.to_string()),
            }),
        }
    }

    #[test]
    fn test_retryable_variants() {
        assert!(FetchError::Throttled("slow down".into()).is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(!FetchError::Schema("no data".into()).is_retryable());
        assert!(!FetchError::Api {
            status: 401,
            message: "bad token".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_structured_throttle_code() {
        let err = classify_graphql_errors(&[error("Rate exceeded", Some("THROTTLED"))]);
        assert_eq!(err, FetchError::Throttled("Rate exceeded".to_string()));
    }

    #[test]
    fn test_message_fallback_for_throttle() {
        let err = classify_graphql_errors(&[error("Throttled", None)]);
        assert!(matches!(err, FetchError::Throttled(_)));
    }

    #[test]
    fn test_code_wins_over_message() {
        // A structured code that is not THROTTLED is trusted over the text
        let err = classify_graphql_errors(&[error("Throttled field access", Some("ACCESS_DENIED"))]);
        assert!(matches!(err, FetchError::Api { .. }));
    }

    #[test]
    fn test_other_errors_are_api_errors() {
        let err = classify_graphql_errors(&[
            error("Field 'foo' doesn't exist", None),
            error("Variable $first is invalid", None),
        ]);
        assert_eq!(
            err,
            FetchError::Api {
                status: 200,
                message: "Field 'foo' doesn't exist; Variable $first is invalid".to_string()
            }
        );
    }
}
