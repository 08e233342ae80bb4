//! Validation pipeline shared by every executor.
//!
//! Validating an event source has two distinct failure classes:
//!
//! - the payload does not parse: the soft result says so and there is
//!   **no** hard error;
//! - the payload parses but breaks the source type's rules: the soft
//!   result carries the reason **and** the hard error
//!   [`ExecutorError::InvalidSource`] is set with the same reason.
//!
//! Callers tell "config was garbage" from "config was well-formed but
//! wrong" by the presence of the hard error.

use gateway_sdk::objects::ValidationResult;
use serde::de::DeserializeOwned;

use crate::errors::ExecutorError;

/// A source type's configuration document.
pub trait SourceConfig: DeserializeOwned {
    type RuleError: std::fmt::Display;

    /// Check the domain rules of an already-parsed configuration.
    fn check(&self) -> Result<(), Self::RuleError>;
}

/// Outcome of `Validate`: the soft result plus an optional hard error.
#[derive(Debug)]
pub struct Validation {
    pub result: ValidationResult,
    pub error: Option<ExecutorError>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            result: ValidationResult::valid(),
            error: None,
        }
    }

    /// Soft failure only; the payload could not be understood.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            result: ValidationResult::invalid(reason),
            error: None,
        }
    }

    /// Soft failure accompanied by the invalid-source hard error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            error: Some(ExecutorError::InvalidSource(reason.clone())),
            result: ValidationResult::invalid(reason),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_valid
    }
}

/// Parse a raw configuration document.
///
/// A blank document or a JSON `null` parses to `None`.
pub fn parse_config<C: DeserializeOwned>(raw: &str) -> Result<Option<C>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<C>>(raw)
}

/// Parse a configuration for `Start`, mapping the failure classes onto
/// [`ExecutorError`].
pub fn load_config<C: DeserializeOwned>(raw: &str) -> Result<C, ExecutorError> {
    parse_config(raw)
        .map_err(|e| ExecutorError::ParseFailed(e.to_string()))?
        .ok_or(ExecutorError::EmptySource)
}

/// Run the full validation pipeline for one configuration type.
pub fn validate_config<C: SourceConfig>(raw: &str) -> Validation {
    let config = match parse_config::<C>(raw) {
        Ok(config) => config,
        Err(e) => {
            let reason = ExecutorError::ParseFailed(e.to_string()).to_string();
            return Validation::malformed(reason);
        }
    };

    let Some(config) = config else {
        return Validation::rejected(ExecutorError::EmptySource.to_string());
    };

    match config.check() {
        Ok(()) => Validation::valid(),
        Err(e) => Validation::rejected(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Port {
        port: u16,
    }

    impl SourceConfig for Port {
        type RuleError = &'static str;

        fn check(&self) -> Result<(), &'static str> {
            if self.port == 0 {
                return Err("port must be non-zero");
            }
            Ok(())
        }
    }

    #[test]
    fn test_unparseable_payload_is_soft_failure() {
        let v = validate_config::<Port>("{port: ");
        assert!(!v.is_valid());
        assert!(v.result.reason.starts_with("failed to parse the event source"));
        assert!(v.error.is_none());
    }

    #[test]
    fn test_rule_violation_is_hard_failure() {
        let v = validate_config::<Port>(r#"{"port": 0}"#);
        assert!(!v.is_valid());
        assert_eq!(v.result.reason, "port must be non-zero");
        assert!(matches!(v.error, Some(ExecutorError::InvalidSource(_))));
    }

    #[test]
    fn test_empty_payload_is_hard_failure() {
        for raw in ["", "   ", "null"] {
            let v = validate_config::<Port>(raw);
            assert_eq!(v.result.reason, "event source can't be empty");
            assert!(matches!(v.error, Some(ExecutorError::InvalidSource(_))));
        }
    }

    #[test]
    fn test_valid_payload() {
        let v = validate_config::<Port>(r#"{"port": 5672}"#);
        assert!(v.is_valid());
        assert_eq!(v.result.reason, "");
        assert!(v.error.is_none());
    }

    #[test]
    fn test_load_config_maps_failure_classes() {
        assert!(matches!(
            load_config::<Port>("[]"),
            Err(ExecutorError::ParseFailed(_))
        ));
        assert!(matches!(
            load_config::<Port>("null"),
            Err(ExecutorError::EmptySource)
        ));
        assert!(matches!(load_config::<Port>(r#"{"port": 1}"#), Ok(Port { port: 1 })));
    }
}
