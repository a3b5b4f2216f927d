//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Everything here is a configuration or input problem detected before any
/// backend is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("No backends configured for domain '{0}'")]
    NoBackends(String),

    #[error("Domain '{domain}' references unregistered provider '{provider}'")]
    UnregisteredProvider { domain: String, provider: String },
}

impl DomainError {
    /// Check if this error comes from static configuration rather than user input
    pub fn is_configuration(&self) -> bool {
        !matches!(self, DomainError::InvalidQuery(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_domain_display() {
        let error = DomainError::UnknownDomain("astrology".to_string());
        assert_eq!(error.to_string(), "Unknown domain: astrology");
    }

    #[test]
    fn test_is_configuration() {
        assert!(DomainError::UnknownDomain("x".to_string()).is_configuration());
        assert!(DomainError::NoBackends("general".to_string()).is_configuration());
        assert!(
            DomainError::UnregisteredProvider {
                domain: "finance".to_string(),
                provider: "mistral".to_string(),
            }
            .is_configuration()
        );
        assert!(!DomainError::InvalidQuery("empty".to_string()).is_configuration());
    }
}
