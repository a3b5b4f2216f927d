//! Council orchestration domain
//!
//! Result types for the three stages, rank parsing and aggregation, and the
//! events of a streaming run.

pub mod event;
pub mod parsing;
pub mod ranking;
pub mod stage;
pub mod value_objects;
