//! Domain profiles
//!
//! Static per-domain configuration: the system prompt and the ordered set of
//! backends to consult, plus the catalog that serves lookups.

pub mod catalog;
pub mod entities;
pub mod validation;
