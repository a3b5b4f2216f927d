//! Application layer for llm-council
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::CouncilParams;
pub use ports::{
    backend::{BackendAdapter, BackendError, BackendRegistry, Completion, TextStream},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    gate::{GateDecision, OpenGate, RequestGate},
    knowledge::{KnowledgeContext, KnowledgeEnhancer, NoKnowledge},
    metrics::{MetricsSink, NoMetrics},
    progress::{NoProgress, ProgressNotifier},
    stream_observer::{NoObserver, StreamObserver},
};
pub use use_cases::run_council::RunCouncilUseCase;
pub use use_cases::stream_council::{CouncilEventStream, StreamCouncilUseCase};
pub use use_cases::{CouncilEngine, CouncilError};
