//! Writes council events to a terminal as they arrive.

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use council_domain::{CouncilEvent, OutputFormat};
use std::io::{self, Write};

/// Renders [`CouncilEvent`]s in one of the output formats.
///
/// `Json` writes one wire-encoded event per line; the other formats print
/// tokens inline and, for `Full`, the stage-1/2 snapshots after the answer.
pub struct StreamRenderer {
    format: OutputFormat,
    failed: bool,
}

impl StreamRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            failed: false,
        }
    }

    /// True once an `Error` event has been rendered
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn render<W: Write>(&mut self, event: &CouncilEvent, out: &mut W) -> io::Result<()> {
        if let CouncilEvent::Error { .. } = event {
            self.failed = true;
        }

        if self.format == OutputFormat::Json {
            writeln!(out, "{}", event.to_wire())?;
            return out.flush();
        }

        match event {
            CouncilEvent::Init { domain, .. } => {
                writeln!(
                    out,
                    "{} {}\n",
                    "=== LLM Council Answer ===".cyan().bold(),
                    format!("[{}]", domain).dimmed()
                )?;
            }
            CouncilEvent::Token { text } => write!(out, "{}", text)?,
            CouncilEvent::Complete {
                stage1,
                stage2,
                stage3,
                timings,
                knowledge_sources,
                disclaimer,
                ..
            } => {
                writeln!(out)?;
                if let Some(disclaimer) = disclaimer {
                    write!(out, "{}", ConsoleFormatter::format_disclaimer(disclaimer))?;
                }
                writeln!(out)?;
                if self.format == OutputFormat::Full {
                    writeln!(out, "{}", "Expert Answers".cyan().bold())?;
                    write!(out, "{}", ConsoleFormatter::format_answers(stage1))?;
                    if !stage2.is_empty() {
                        writeln!(out, "\n{}", "Peer Reviews".cyan().bold())?;
                        write!(out, "{}", ConsoleFormatter::format_reviews(stage2))?;
                    }
                    write!(out, "{}", ConsoleFormatter::format_sources(knowledge_sources))?;
                    writeln!(out)?;
                }
                writeln!(
                    out,
                    "{}",
                    format!(
                        "Synthesized by {}/{} ({} of {} experts answered, {}ms)",
                        stage3.provider,
                        stage3.model,
                        stage1.iter().filter(|a| a.succeeded).count(),
                        stage1.len(),
                        timings.total_ms
                    )
                    .dimmed()
                )?;
            }
            CouncilEvent::Error { message } => {
                writeln!(out, "\n{} {}", "Error:".red().bold(), message)?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{Domain, ExpertAnswer, PeerReview, StageTimings, SynthesisResult};

    fn events() -> Vec<CouncilEvent> {
        vec![
            CouncilEvent::Init {
                query_id: "q-1".to_string(),
                domain: Domain::Finance,
            },
            CouncilEvent::token("Save "),
            CouncilEvent::token("early."),
            CouncilEvent::Complete {
                query_id: "q-1".to_string(),
                stage1: vec![
                    ExpertAnswer::success("openai", "gpt-4o", "Save."),
                    ExpertAnswer::success("anthropic", "claude", "Invest."),
                ],
                stage2: vec![PeerReview::new("openai", "anthropic", 1, "fine")],
                stage3: SynthesisResult::new("openai", "gpt-4o", "Save early."),
                timings: StageTimings::new(10, 20, 30),
                knowledge_sources: vec!["savings-basics".to_string()],
                disclaimer: Some("Not financial advice.".to_string()),
            },
        ]
    }

    fn render_all(format: OutputFormat, events: &[CouncilEvent]) -> (String, bool) {
        colored::control::set_override(false);
        let mut renderer = StreamRenderer::new(format);
        let mut out = Vec::new();
        for event in events {
            renderer.render(event, &mut out).unwrap();
        }
        (String::from_utf8(out).unwrap(), renderer.failed())
    }

    #[test]
    fn test_synthesis_format_prints_tokens_inline() {
        let (output, failed) = render_all(OutputFormat::Synthesis, &events());
        assert!(!failed);
        assert!(output.contains("[finance]"));
        assert!(output.contains("Save early."));
        assert!(output.contains("Synthesized by openai/gpt-4o (2 of 2 experts answered, 60ms)"));
        assert!(!output.contains("Peer Reviews"));
        assert!(output.contains("Note: Not financial advice."));
        assert!(!output.contains("Sources:"));
    }

    #[test]
    fn test_full_format_adds_snapshots() {
        let (output, _) = render_all(OutputFormat::Full, &events());
        assert!(output.contains("Expert Answers"));
        assert!(output.contains("── openai reviewed anthropic ── rank 1"));
        assert!(output.contains("Note: Not financial advice."));
        assert!(output.contains("Sources: savings-basics"));
    }

    #[test]
    fn test_json_format_one_event_per_line() {
        let (output, _) = render_all(OutputFormat::Json, &events());
        let types: Vec<String> = output
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["type"].to_string())
            .collect();
        assert_eq!(types, vec!["\"init\"", "\"token\"", "\"token\"", "\"complete\""]);
    }

    #[test]
    fn test_error_marks_failure() {
        let (output, failed) =
            render_all(OutputFormat::Synthesis, &[CouncilEvent::error("Timed out")]);
        assert!(failed);
        assert!(output.contains("Error: Timed out"));
    }
}
