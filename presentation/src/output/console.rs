//! Console output formatter for council results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use council_domain::{CouncilResult, ExpertAnswer, PeerReview, ReviewStatus, aggregate_ranks};

/// Formats council results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Turn terminal colors on or off for every formatter in the process
    pub fn set_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    /// Format every stage of the result
    pub fn format(result: &CouncilResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("LLM Council Results"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Question:".cyan().bold(),
            result.original_query
        ));
        output.push_str(&format!("{} {}\n", "Domain:".cyan().bold(), result.domain));
        if !result.knowledge_sources.is_empty() {
            output.push_str(&format!(
                "{} {}\n",
                "Sources:".cyan().bold(),
                result.knowledge_sources.join(", ")
            ));
        }
        output.push('\n');

        output.push_str(&Self::section_header("Stage 1: Expert Answers"));
        output.push_str(&Self::format_answers(&result.stage1));

        if !result.stage2.is_empty() {
            output.push_str(&Self::section_header("Stage 2: Peer Reviews"));
            output.push_str(&Self::format_reviews(&result.stage2));
            output.push_str(&Self::format_ranking(result));
        }

        output.push_str(&Self::section_header("Stage 3: Synthesis"));
        output.push_str(&format!(
            "\n{}\n\n{}\n",
            format!("Synthesizer: {}/{}", result.stage3.provider, result.stage3.model)
                .yellow()
                .bold(),
            result.stage3.synthesis
        ));

        if let Some(disclaimer) = &result.disclaimer {
            output.push_str(&Self::format_disclaimer(disclaimer));
        }
        output.push_str(&Self::format_sources(&result.knowledge_sources));

        output.push_str(&format!(
            "\n{} stage1 {}ms, stage2 {}ms, stage3 {}ms, total {}ms\n",
            "Timings:".dimmed(),
            result.timings.stage1_ms,
            result.timings.stage2_ms,
            result.timings.stage3_ms,
            result.timings.total_ms
        ));

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(result: &CouncilResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the synthesis only (concise output)
    pub fn format_synthesis_only(result: &CouncilResult) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n\n", "=== LLM Council Answer ===".cyan().bold()));
        output.push_str(&format!("{} {}\n\n", "Q:".bold(), result.original_query));

        let consulted: Vec<&str> = result.stage1.iter().map(|a| a.provider.as_str()).collect();
        output.push_str(&format!(
            "{} {} ({} answered, synthesized by {})\n\n",
            "Experts consulted:".dimmed(),
            consulted.join(", "),
            result.successful_answers().count(),
            result.stage3.provider
        ));

        output.push_str(&result.stage3.synthesis);
        output.push('\n');

        if let Some(disclaimer) = &result.disclaimer {
            output.push_str(&Self::format_disclaimer(disclaimer));
        }
        output
    }

    pub fn format_answers(answers: &[ExpertAnswer]) -> String {
        let mut output = String::new();
        for answer in answers {
            let title = format!("── {}/{} ──", answer.provider, answer.model);
            match answer.error_message() {
                None => output.push_str(&format!("\n{}\n{}\n", title.yellow().bold(), answer.text)),
                Some(error) => output.push_str(&format!(
                    "\n{}\n{} {}\n",
                    title.red().bold(),
                    "Error:".red(),
                    error
                )),
            }
        }
        output
    }

    pub fn format_reviews(reviews: &[PeerReview]) -> String {
        let mut output = String::new();
        for review in reviews {
            let note = match review.status {
                ReviewStatus::Parsed => String::new(),
                ReviewStatus::Unparseable => format!(" {}", "(unparseable, default rank)".dimmed()),
                ReviewStatus::Failed => format!(" {}", "(review failed, default rank)".red()),
            };
            output.push_str(&format!(
                "\n{} rank {}{}\n{}\n",
                format!("── {} reviewed {} ──", review.reviewer, review.target)
                    .yellow()
                    .bold(),
                review.rank,
                note,
                Self::indent(&review.reasoning, "  ")
            ));
        }
        output
    }

    fn format_ranking(result: &CouncilResult) -> String {
        let candidates: Vec<&str> = result
            .successful_answers()
            .map(|a| a.provider.as_str())
            .collect();

        let mut output = format!("\n{}\n", "Mean peer rank (lower is better):".cyan().bold());
        for aggregate in aggregate_ranks(&candidates, &result.stage2) {
            let mean = aggregate
                .mean()
                .map(|m| format!("{:.2}", m))
                .unwrap_or_else(|| "unranked".to_string());
            output.push_str(&format!(
                "  * {} {} ({} reviews)\n",
                aggregate.provider, mean, aggregate.review_count
            ));
        }
        output
    }

    pub fn format_disclaimer(disclaimer: &str) -> String {
        format!("\n{} {}\n", "Note:".magenta().bold(), disclaimer.italic())
    }

    /// Knowledge sources consulted; empty when there were none
    pub fn format_sources(sources: &[String]) -> String {
        if sources.is_empty() {
            return String::new();
        }
        format!("\n{} {}\n", "Sources:".dimmed(), sources.join(", "))
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &CouncilResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &CouncilResult) -> String {
        Self::format_json(result)
    }

    fn format_synthesis_only(&self, result: &CouncilResult) -> String {
        Self::format_synthesis_only(result)
    }
}
