//! Infrastructure layer for llm-council
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: HTTP backends, configuration file loading, the
//! metrics store, the knowledge base, the request gate and the JSONL
//! council transcript.

pub mod config;
pub mod gate;
pub mod knowledge;
pub mod logging;
pub mod metrics;
pub mod providers;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig, FileOutputConfig};
pub use gate::{WindowedRateLimiter, build_gate};
pub use knowledge::StaticKnowledgeBase;
pub use logging::JsonlConversationLogger;
pub use metrics::{InMemoryMetrics, MetricsSnapshot};
pub use providers::{AnthropicBackend, OpenAiCompatibleBackend, ProviderKind, build_registry};
