//! Application-level configuration.
//!
//! - [`CouncilParams`] - review toggle and streaming wait ceilings

pub mod council_params;

pub use council_params::{CouncilParams, DEFAULT_FIRST_ANSWER_TIMEOUT};
