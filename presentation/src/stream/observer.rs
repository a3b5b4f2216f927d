//! Stage notices printed to stderr while the synthesis streams to stdout.

use colored::Colorize;
use council_application::{CouncilError, StreamObserver};
use council_domain::{ExpertAnswer, PeerReview};

pub struct ConsoleStreamObserver {
    quiet: bool,
}

impl ConsoleStreamObserver {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub(crate) fn stage1_notice(answers: &[ExpertAnswer]) -> String {
        let failed: Vec<&str> = answers
            .iter()
            .filter(|a| !a.succeeded)
            .map(|a| a.provider.as_str())
            .collect();
        let mut notice = format!(
            "Stage 1: {}/{} experts answered",
            answers.len() - failed.len(),
            answers.len()
        );
        if !failed.is_empty() {
            notice.push_str(&format!(" (failed: {})", failed.join(", ")));
        }
        notice
    }
}

impl StreamObserver for ConsoleStreamObserver {
    fn on_stage1_complete(&self, answers: &[ExpertAnswer]) {
        if !self.quiet {
            eprintln!("{} {}", "->".cyan(), Self::stage1_notice(answers));
        }
    }

    fn on_stage2_complete(&self, reviews: &[PeerReview]) {
        if !self.quiet {
            eprintln!("{} Stage 2: {} peer reviews", "->".cyan(), reviews.len());
        }
    }

    fn on_error(&self, error: &CouncilError) {
        // Terminal errors are also rendered on stdout; this covers non-fatal ones
        if !self.quiet {
            eprintln!("{} {}", "!".yellow().bold(), error);
        }
    }
}
