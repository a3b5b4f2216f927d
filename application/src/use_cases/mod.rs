//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod engine;
pub mod error;
pub mod run_council;
pub mod stream_council;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::CouncilEngine;
pub use error::CouncilError;
