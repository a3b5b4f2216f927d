//! Errors surfaced by the council use cases

use council_domain::DomainError;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a council run.
///
/// Individual backend failures and unparseable reviews are not errors at
/// this level; they are folded into the stage results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CouncilError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] DomainError),

    #[error("No expert produced an answer")]
    NoSuccessfulAnswers,

    #[error("Synthesis by {provider} failed: {message}")]
    Synthesis { provider: String, message: String },

    #[error("Timed out after {waited:?} waiting for the council")]
    Timeout { waited: Duration },

    #[error("Background stage task failed: {0}")]
    Background(String),
}

impl CouncilError {
    /// True when the run failed before any backend was contacted
    pub fn is_configuration(&self) -> bool {
        matches!(self, CouncilError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_convert_to_configuration() {
        let err: CouncilError = DomainError::UnknownDomain("astrology".to_string()).into();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: Unknown domain: astrology");
    }

    #[test]
    fn test_timeout_message() {
        let err = CouncilError::Timeout {
            waited: Duration::from_secs(60),
        };
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "Timed out after 60s waiting for the council");
    }
}
