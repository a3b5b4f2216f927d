//! Prompt domain
//!
//! Templates for the prompts sent at each stage of the council flow.

mod template;

pub use template::PromptTemplate;
