//! Rank parsing for peer reviews.
//!
//! Reviewers are asked to answer with a JSON object, but model output is
//! free-form text, so parsing is an explicit fallible step with a defined
//! default. No I/O, just text pattern matching.
//!
//! # Supported Formats
//!
//! 1. **JSON** (preferred): `{"rank": 2, "reasoning": "..."}`, possibly
//!    wrapped in prose or a markdown code block
//! 2. **Fraction**: `2/3`
//! 3. **Leading integer**: the first integer in the text (`Rank: 2`)
//!
//! Every parsed rank is clamped into `[1, N]`.

use super::value_objects::ReviewStatus;
use thiserror::Error;

/// Errors from [`parse_rank_response`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankParseError {
    #[error("No rank found in reviewer response")]
    NoRankFound,

    #[error("Ranking scale must have at least one position")]
    EmptyScale,
}

/// A rank extracted from a reviewer's response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankVerdict {
    /// Clamped into `[1, N]`
    pub rank: u32,
    pub reasoning: String,
}

/// Rank used when a review cannot be parsed or the review call failed.
///
/// The middle of the scale, rounded toward the worse end.
pub fn default_rank(scale: u32) -> u32 {
    (scale / 2 + 1).clamp(1, scale.max(1))
}

/// Parse a reviewer's response into a rank on a `1..=scale` scale.
///
/// # Examples
///
/// ```
/// use council_domain::council::parsing::parse_rank_response;
///
/// let v = parse_rank_response(r#"{"rank": 1, "reasoning": "Accurate"}"#, 3).unwrap();
/// assert_eq!(v.rank, 1);
/// assert_eq!(v.reasoning, "Accurate");
///
/// assert_eq!(parse_rank_response("Rank: 7", 3).unwrap().rank, 3); // clamped
/// assert!(parse_rank_response("no idea", 3).is_err());
/// ```
pub fn parse_rank_response(response: &str, scale: u32) -> Result<RankVerdict, RankParseError> {
    if scale == 0 {
        return Err(RankParseError::EmptyScale);
    }

    if let Some(verdict) = parse_json_rank(response, scale) {
        return Ok(verdict);
    }

    let rank = find_leading_integer(response).ok_or(RankParseError::NoRankFound)?;
    Ok(RankVerdict {
        rank: clamp_rank(rank, scale),
        reasoning: response.trim().to_string(),
    })
}

/// Parse a response, falling back to [`default_rank`] on failure.
///
/// Returns the verdict together with the status to record on the review.
pub fn rank_or_default(response: &str, scale: u32) -> (RankVerdict, ReviewStatus) {
    match parse_rank_response(response, scale) {
        Ok(verdict) => (verdict, ReviewStatus::Parsed),
        Err(_) => (
            RankVerdict {
                rank: default_rank(scale),
                reasoning: response.trim().to_string(),
            },
            ReviewStatus::Unparseable,
        ),
    }
}

fn parse_json_rank(response: &str, scale: u32) -> Option<RankVerdict> {
    let start = response.find('{')?;
    let end = response[start..].rfind('}')?;
    let json_str = &response[start..start + end + 1];
    let parsed: serde_json::Value = serde_json::from_str(json_str).ok()?;

    let raw = parsed.get("rank")?;
    let rank = raw
        .as_f64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse::<f64>().ok()))?;

    let reasoning = ["reasoning", "justification", "reason"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(|v| v.as_str()))
        .unwrap_or_default()
        .to_string();

    let rank = if rank.is_finite() { rank.round() } else { return None };
    let rank = if rank < 1.0 { 1 } else { rank.min(u32::MAX as f64) as u64 };

    Some(RankVerdict {
        rank: clamp_rank(rank, scale),
        reasoning,
    })
}

fn find_leading_integer(response: &str) -> Option<u64> {
    response.split_whitespace().find_map(|word| {
        // "2/3" ranks as 2
        let head = word.split('/').next().unwrap_or(word);
        let digits = head.trim_matches(|c: char| !c.is_ascii_digit());
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        // All digits, so the only failure is overflow
        Some(digits.parse::<u64>().unwrap_or(u64::MAX))
    })
}

fn clamp_rank(rank: u64, scale: u32) -> u32 {
    rank.clamp(1, u64::from(scale)) as u32
}
