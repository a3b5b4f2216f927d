//! Prompt templates for the council flow

use crate::council::value_objects::{ExpertAnswer, PeerReview};

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// User prompt for stage 1.
    ///
    /// When the knowledge enhancer supplied reference text it is placed
    /// ahead of the question; with no context the question is sent as-is.
    pub fn expert_query(question: &str, context: Option<&str>) -> String {
        match context.map(str::trim).filter(|c| !c.is_empty()) {
            Some(context) => format!(
                r#"Reference material:
{}

Question:
{}

Use the reference material where it is relevant, and say so when it is not."#,
                context, question
            ),
            None => question.to_string(),
        }
    }

    /// System prompt for peer review
    pub fn review_system() -> &'static str {
        r#"You are a critical reviewer evaluating an answer written by another expert.
Assess accuracy, completeness, clarity and practical usefulness.
Be fair and specific. Respond only with the JSON object you are asked for."#
    }

    /// User prompt asking one reviewer to rank one answer on a `1..=scale` scale
    pub fn review_prompt(question: &str, answer_label: &str, answer: &str, scale: u32) -> String {
        format!(
            r#"Original question: {question}

{scale} experts answered this question. Here is {answer_label}:

--- {answer_label} ---
{answer}
--- end ---

Rank this answer against the others on a scale from 1 (best) to {scale} (worst).
Reply with a JSON object and nothing else:

{{"rank": <integer 1-{scale}>, "reasoning": "<one or two sentences of justification>"}}"#
        )
    }

    /// System prompt for synthesis
    pub fn synthesis_system() -> &'static str {
        r#"You are the chair of an expert council, writing the council's final answer.
Combine the strongest, best-supported elements of the expert answers.
Resolve disagreements using the peer reviews, and note any that remain open.
Write for the person who asked, not for the experts. Do not mention the review process."#
    }

    /// User prompt for synthesis.
    ///
    /// Embeds every stage-1 answer (failed ones marked as unavailable) and
    /// every stage-2 review.
    pub fn synthesis_prompt(question: &str, answers: &[ExpertAnswer], reviews: &[PeerReview]) -> String {
        let mut prompt = format!("Original question: {}\n\nExpert answers:\n", question);

        for answer in answers {
            if answer.succeeded {
                prompt.push_str(&format!(
                    "\n--- {} ({}) ---\n{}\n",
                    answer.provider, answer.model, answer.text
                ));
            } else {
                prompt.push_str(&format!(
                    "\n--- {} ({}) --- [unavailable]\n{}\n",
                    answer.provider, answer.model, answer.text
                ));
            }
        }

        if !reviews.is_empty() {
            prompt.push_str("\nPeer reviews (rank 1 is best):\n");
            for review in reviews {
                prompt.push_str(&format!(
                    "\n- {} ranked {}: {} ({})\n",
                    review.reviewer, review.target, review.rank, review.reasoning
                ));
            }
        }

        prompt.push_str(
            "\nWrite the final answer to the original question, drawing on the answers and reviews above.",
        );

        prompt
    }

    /// Anonymous label for the n-th answer ("Response A", "Response B", ...)
    pub fn answer_label(index: usize) -> String {
        let letter = (b'A' + (index % 26) as u8) as char;
        if index < 26 {
            format!("Response {}", letter)
        } else {
            format!("Response {}{}", letter, index / 26)
        }
    }
}
