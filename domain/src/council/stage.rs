//! Council pipeline stages

use serde::{Deserialize, Serialize};

/// Stage of a council run
///
/// Runs strictly in order: `Experts → Review → Synthesis`, with no reentry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Stage 1 - every backend answers independently
    Experts,
    /// Stage 2 - backends rank each other's answers
    Review,
    /// Stage 3 - the chosen backend synthesizes a final answer
    Synthesis,
}

impl Stage {
    /// Stable identifier used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Experts => "stage1",
            Stage::Review => "stage2",
            Stage::Synthesis => "stage3",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Experts => "Expert Answers",
            Stage::Review => "Peer Review",
            Stage::Synthesis => "Synthesis",
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            Stage::Experts => 1,
            Stage::Review => 2,
            Stage::Synthesis => 3,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
