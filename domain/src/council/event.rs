//! Events emitted by a streaming council run.
//!
//! A well-formed stream is `Init, Token*, Complete` or ends with a single
//! `Error`. A configuration failure before anything was emitted yields only
//! `Error`.

use super::value_objects::{ExpertAnswer, PeerReview, StageTimings, SynthesisResult};
use crate::core::domain::Domain;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouncilEvent {
    /// First event of a stream
    Init { query_id: String, domain: Domain },
    /// A fragment of the stage-3 synthesis, in order
    Token { text: String },
    /// Last event of a successful stream, with the stage-1/2 snapshots
    Complete {
        query_id: String,
        stage1: Vec<ExpertAnswer>,
        stage2: Vec<PeerReview>,
        stage3: SynthesisResult,
        timings: StageTimings,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        knowledge_sources: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        disclaimer: Option<String>,
    },
    /// Terminal failure; nothing follows
    Error { message: String },
}

impl CouncilEvent {
    pub fn token(text: impl Into<String>) -> Self {
        CouncilEvent::Token { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        CouncilEvent::Error {
            message: message.into(),
        }
    }

    /// Returns the text if this is a `Token` event.
    pub fn text(&self) -> Option<&str> {
        match self {
            CouncilEvent::Token { text } => Some(text),
            _ => None,
        }
    }

    /// Returns true if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CouncilEvent::Complete { .. } | CouncilEvent::Error { .. })
    }

    /// Single-line JSON encoding, suitable as an SSE `data:` payload
    pub fn to_wire(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"unserializable event: {}"}}"#, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_text_and_not_terminal() {
        let event = CouncilEvent::token("Hyper");
        assert_eq!(event.text(), Some("Hyper"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn error_is_terminal() {
        let event = CouncilEvent::error("boom");
        assert_eq!(event.text(), None);
        assert!(event.is_terminal());
    }

    #[test]
    fn wire_format_is_tagged_json() {
        let init = CouncilEvent::Init {
            query_id: "q1".to_string(),
            domain: Domain::Healthcare,
        };
        let value: serde_json::Value = serde_json::from_str(&init.to_wire()).unwrap();
        assert_eq!(value["type"], "init");
        assert_eq!(value["query_id"], "q1");
        assert_eq!(value["domain"], "healthcare");

        let token: serde_json::Value =
            serde_json::from_str(&CouncilEvent::token("a\nb").to_wire()).unwrap();
        assert_eq!(token["type"], "token");
        assert_eq!(token["text"], "a\nb");
        assert!(!CouncilEvent::token("a\nb").to_wire().contains('\n'));
    }

    #[test]
    fn complete_carries_disclaimer_and_sources() {
        let complete = CouncilEvent::Complete {
            query_id: "q1".to_string(),
            stage1: vec![ExpertAnswer::success("openai", "gpt-4o", "Rest.")],
            stage2: Vec::new(),
            stage3: SynthesisResult::new("openai", "gpt-4o", "Rest."),
            timings: StageTimings::new(1, 0, 2),
            knowledge_sources: vec!["bp-guidelines".to_string()],
            disclaimer: Some("Not medical advice.".to_string()),
        };
        let value: serde_json::Value = serde_json::from_str(&complete.to_wire()).unwrap();
        assert_eq!(value["disclaimer"], "Not medical advice.");
        assert_eq!(value["knowledge_sources"][0], "bp-guidelines");

        let decoded: CouncilEvent = serde_json::from_str(&complete.to_wire()).unwrap();
        assert_eq!(decoded, complete);
    }

    #[test]
    fn complete_omits_absent_disclaimer() {
        let wire = CouncilEvent::Complete {
            query_id: "q1".to_string(),
            stage1: Vec::new(),
            stage2: Vec::new(),
            stage3: SynthesisResult::new("openai", "gpt-4o", "Hi."),
            timings: StageTimings::new(1, 0, 2),
            knowledge_sources: Vec::new(),
            disclaimer: None,
        }
        .to_wire();
        assert!(!wire.contains("disclaimer"));
        assert!(!wire.contains("knowledge_sources"));
    }
}
