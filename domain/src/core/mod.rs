//! Core domain concepts shared across all subdomains.
//!
//! - [`domain::Domain`]: the subject-matter domain of a query
//! - [`query::Query`]: a validated question to pose to the council
//! - [`error::DomainError`]: configuration and input errors

pub mod domain;
pub mod error;
pub mod query;
pub mod string;
