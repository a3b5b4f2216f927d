//! Request gate port
//!
//! Evaluated by the caller before a query reaches either orchestrator.
//! A denied query never contacts a backend.

use council_domain::Query;

/// Outcome of a gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    /// Why the query was denied
    pub reason: Option<String>,
    /// Text to show alongside an allowed answer
    pub disclaimer: Option<String>,
}

impl GateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            disclaimer: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            disclaimer: None,
        }
    }

    pub fn with_disclaimer(mut self, disclaimer: impl Into<String>) -> Self {
        self.disclaimer = Some(disclaimer.into());
        self
    }
}

pub trait RequestGate: Send + Sync {
    fn check(&self, query: &Query) -> GateDecision;
}

/// Gate that admits every query
pub struct OpenGate;

impl RequestGate for OpenGate {
    fn check(&self, _query: &Query) -> GateDecision {
        GateDecision::allow()
    }
}
