pub mod stream;

pub use stream::{StreamCloseCode, StreamServerMessage};

use serde::{Deserialize, Serialize};

/// An event source as handed to an executor.
///
/// `data` is the raw configuration document for the source type (JSON
/// text). The gateway never rewrites it; each executor parses it on its
/// own terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    pub name: String,
    #[serde(default)]
    pub data: String,
}

impl EventSource {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Soft outcome of validating an event source.
///
/// ```json
/// {"isValid":false,"reason":"must have either schedule or interval"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default)]
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: String::new(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
        }
    }
}

/// Named failure classes surfaced to callers.
///
/// Lets a caller tell failure classes apart without inspecting the
/// free-text reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The configuration payload was present but empty.
    EmptySource,
    /// The configuration payload could not be parsed.
    ParseFailure,
    /// The configuration parsed but violates the source type's rules.
    InvalidSource,
    /// The external system could not be reached or dropped the link.
    Connection,
    /// The listener task faulted and was stopped.
    ListenerFault,
    /// The outbound stream could not be written.
    Stream,
    /// No executor is registered for the requested source type.
    UnknownSourceType,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::EmptySource => "empty_source",
            ErrorCategory::ParseFailure => "parse_failure",
            ErrorCategory::InvalidSource => "invalid_source",
            ErrorCategory::Connection => "connection",
            ErrorCategory::ListenerFault => "listener_fault",
            ErrorCategory::Stream => "stream",
            ErrorCategory::UnknownSourceType => "unknown_source_type",
        };
        f.write_str(s)
    }
}

/// Error body returned by non-streaming endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub category: ErrorCategory,
    pub reason: String,
}

/// Response of `GET /api/v1/sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceKinds {
    pub kinds: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_wire_shape() {
        let json = serde_json::to_string(&ValidationResult::invalid("nope")).unwrap();
        assert_eq!(json, r#"{"isValid":false,"reason":"nope"}"#);

        let parsed: ValidationResult = serde_json::from_str(r#"{"isValid":true}"#).unwrap();
        assert_eq!(parsed, ValidationResult::valid());
    }

    #[test]
    fn test_error_category_display_matches_serde() {
        for category in [
            ErrorCategory::EmptySource,
            ErrorCategory::ParseFailure,
            ErrorCategory::InvalidSource,
            ErrorCategory::UnknownSourceType,
        ] {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
        }
    }
}
