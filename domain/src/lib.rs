//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A question is answered by several independent backends (stage 1), each
//! backend ranks every other backend's answer (stage 2), and the backend
//! with the lowest mean peer rank writes the final answer (stage 3).
//!
//! ## Domain Profiles
//!
//! Each [`Domain`] maps to a [`DomainProfile`]: a system prompt and the
//! ordered list of backends to consult. The order doubles as the
//! deterministic tie-break when choosing a synthesizer.

pub mod config;
pub mod core;
pub mod council;
pub mod profile;
pub mod prompt;

// Re-export commonly used types
pub use config::OutputFormat;
pub use core::{domain::Domain, error::DomainError, query::Query, string::truncate};
pub use council::{
    event::CouncilEvent,
    parsing::{RankParseError, RankVerdict, default_rank, parse_rank_response, rank_or_default},
    ranking::{RankAggregate, aggregate_ranks, select_synthesizer},
    stage::Stage,
    value_objects::{
        CouncilResult, ERROR_MARKER, ExpertAnswer, PeerReview, ReviewStatus, StageTimings,
        SynthesisResult,
    },
};
pub use profile::{
    catalog::DomainCatalog,
    entities::{BackendSpec, DomainProfile},
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use prompt::PromptTemplate;
