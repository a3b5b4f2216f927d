//! Knowledge enhancer adapters.

mod static_kb;

pub use static_kb::{KnowledgeSnippet, StaticKnowledgeBase};
