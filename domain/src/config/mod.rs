//! Configuration value objects for the domain layer
//!
//! Configuration concepts shared by the config loader and the CLI.

mod output_format;

pub use output_format::OutputFormat;
