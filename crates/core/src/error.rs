//! Error taxonomy shared by every operation
//!
//! Remote failures are mapped exactly once, at the remote client boundary,
//! through [`ScoutError::from_status`]. Local validation failures never reach
//! the network layer. At the operation boundary every error becomes a
//! [`ToolOutcome`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    RateLimited,
    InvalidInput,
    UpstreamApiError,
    Timeout,
    Cancelled,
    JobFailed,
    ConfigurationError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UpstreamApiError => "upstream_api_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::JobFailed => "job_failed",
            ErrorKind::ConfigurationError => "configuration_error",
            ErrorKind::Internal => "internal",
        }
    }

    /// Deterministic mapping from an HTTP status to an error kind.
    /// Returns `None` for success statuses.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            401 | 403 => Some(ErrorKind::Unauthorized),
            404 => Some(ErrorKind::NotFound),
            429 => Some(ErrorKind::RateLimited),
            _ => Some(ErrorKind::UpstreamApiError),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScoutError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{message}")]
    NotFound {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Invalid input: {}", .issues.join("; "))]
    InvalidInput { issues: Vec<String> },

    #[error("Upstream API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Job {job_id} failed [{code}]: {message}")]
    JobFailed {
        job_id: String,
        code: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScoutError::Unauthorized(_) => ErrorKind::Unauthorized,
            ScoutError::NotFound { .. } => ErrorKind::NotFound,
            ScoutError::RateLimited { .. } => ErrorKind::RateLimited,
            ScoutError::InvalidInput { .. } => ErrorKind::InvalidInput,
            ScoutError::Upstream { .. } => ErrorKind::UpstreamApiError,
            ScoutError::Timeout { .. } => ErrorKind::Timeout,
            ScoutError::Cancelled(_) => ErrorKind::Cancelled,
            ScoutError::JobFailed { .. } => ErrorKind::JobFailed,
            ScoutError::Configuration(_) => ErrorKind::ConfigurationError,
            ScoutError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid_input(issue: impl Into<String>) -> Self {
        ScoutError::InvalidInput {
            issues: vec![issue.into()],
        }
    }

    pub fn unknown_technology(id: &str, suggestions: Vec<String>) -> Self {
        ScoutError::NotFound {
            message: format!("Unknown technology: {id}"),
            suggestions,
        }
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            ScoutError::NotFound { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Map a non-2xx response to a domain error.
    ///
    /// `body` is the raw response body; when it is a JSON object with a
    /// `message` (or `error`) string that text is used. `retry_after` comes
    /// from the `Retry-After` header when the transport saw one.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| default_message(status));

        match ErrorKind::from_status(status) {
            Some(ErrorKind::Unauthorized) => ScoutError::Unauthorized(message),
            Some(ErrorKind::NotFound) => ScoutError::NotFound {
                message,
                suggestions: Vec::new(),
            },
            Some(ErrorKind::RateLimited) => ScoutError::RateLimited {
                message,
                retry_after,
            },
            Some(_) => ScoutError::Upstream {
                status: Some(status),
                message,
            },
            None => ScoutError::Internal(format!(
                "status {status} is a success and cannot be mapped to an error"
            )),
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"].iter().find_map(|field| match value.get(field) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Object(inner)) => inner
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    })
}

fn default_message(status: u16) -> String {
    match status {
        401 => "Missing or invalid API key".to_string(),
        403 => "API key does not grant access to this resource".to_string(),
        404 => "Resource not found".to_string(),
        429 => "Too many requests".to_string(),
        _ => format!("Request failed with HTTP {status}"),
    }
}

/// Structured result returned by every caller-facing operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub ok: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            error_kind: None,
            suggestions: Vec::new(),
        }
    }

    pub fn failure(error: &ScoutError) -> Self {
        let mut text = format!("Error ({}): {error}", error.kind());
        if !error.suggestions().is_empty() {
            text.push_str(&format!(
                "\nDid you mean: {}?",
                error.suggestions().join(", ")
            ));
        }

        Self {
            ok: false,
            text,
            error_kind: Some(error.kind()),
            suggestions: error.suggestions().to_vec(),
        }
    }
}

impl From<Result<String, ScoutError>> for ToolOutcome {
    fn from(result: Result<String, ScoutError>) -> Self {
        match result {
            Ok(text) => ToolOutcome::success(text),
            Err(error) => ToolOutcome::failure(&error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // status mapping tests
    // ============================================================================

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(ErrorKind::from_status(200), None);
        assert_eq!(ErrorKind::from_status(204), None);
        assert_eq!(ErrorKind::from_status(401), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(403), Some(ErrorKind::Unauthorized));
        assert_eq!(ErrorKind::from_status(404), Some(ErrorKind::NotFound));
        assert_eq!(ErrorKind::from_status(429), Some(ErrorKind::RateLimited));
        assert_eq!(ErrorKind::from_status(500), Some(ErrorKind::UpstreamApiError));
        assert_eq!(ErrorKind::from_status(418), Some(ErrorKind::UpstreamApiError));
        assert_eq!(ErrorKind::from_status(302), Some(ErrorKind::UpstreamApiError));
    }

    #[test]
    fn test_from_status_uses_body_message() {
        let err = ScoutError::from_status(500, r#"{"message":"database on fire"}"#, None);
        assert_eq!(
            err,
            ScoutError::Upstream {
                status: Some(500),
                message: "database on fire".to_string()
            }
        );
    }

    #[test]
    fn test_from_status_nested_error_object() {
        let err = ScoutError::from_status(401, r#"{"error":{"message":"bad key"}}"#, None);
        assert_eq!(err, ScoutError::Unauthorized("bad key".to_string()));
    }

    #[test]
    fn test_from_status_falls_back_on_plain_body() {
        let err = ScoutError::from_status(429, "slow down", Some(30));
        assert_eq!(
            err,
            ScoutError::RateLimited {
                message: "Too many requests".to_string(),
                retry_after: Some(30)
            }
        );
    }

    #[test]
    fn test_from_status_not_found_has_no_suggestions() {
        let err = ScoutError::from_status(404, "", None);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.suggestions().is_empty());
    }

    // ============================================================================
    // outcome tests
    // ============================================================================

    #[test]
    fn test_outcome_failure_carries_kind_and_suggestions() {
        let err = ScoutError::unknown_technology("nexjs", vec!["nextjs".to_string()]);
        let outcome = ToolOutcome::failure(&err);
        assert!(!outcome.ok);
        assert_eq!(outcome.error_kind, Some(ErrorKind::NotFound));
        assert_eq!(outcome.suggestions, vec!["nextjs".to_string()]);
        assert!(outcome.text.contains("Unknown technology: nexjs"));
        assert!(outcome.text.contains("Did you mean: nextjs?"));
    }

    #[test]
    fn test_outcome_from_result() {
        let outcome: ToolOutcome = Ok::<_, ScoutError>("done".to_string()).into();
        assert!(outcome.ok);
        assert_eq!(outcome.text, "done");
        assert_eq!(outcome.error_kind, None);
    }

    #[test]
    fn test_invalid_input_joins_issues() {
        let err = ScoutError::InvalidInput {
            issues: vec!["a is required".to_string(), "b must be a string".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid input: a is required; b must be a string"
        );
    }

    #[test]
    fn test_job_failed_kind() {
        let err = ScoutError::JobFailed {
            job_id: "j1".to_string(),
            code: "GENERATION_FAILED".to_string(),
            message: "model unavailable".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::JobFailed);
        assert!(err.to_string().contains("GENERATION_FAILED"));
    }
}
