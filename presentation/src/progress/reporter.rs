//! Progress reporting for a council run

use colored::Colorize;
use council_application::ProgressNotifier;
use council_domain::Stage;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;

/// Reports stage progress with indicatif bars on stderr
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Reporter that draws nowhere; used in tests
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    pub(crate) fn stage_title(stage: Stage) -> String {
        format!("Stage {}: {}", stage.number(), stage.display_name())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.stage_bar.lock()
            && let Some(bar) = guard.as_ref()
        {
            f(bar);
        }
    }

    /// Position of the current stage bar, if one is active
    pub fn position(&self) -> Option<u64> {
        self.stage_bar
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(ProgressBar::position))
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        let bar = self.multi.add(ProgressBar::new(total_tasks as u64));
        bar.set_style(Self::stage_style());
        bar.set_prefix(Self::stage_title(stage));
        bar.set_message("Starting...");

        if let Ok(mut guard) = self.stage_bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_task_complete(&self, _stage: Stage, label: &str, success: bool) {
        self.with_bar(|bar| {
            let status = if success {
                format!("{} {}", "v".green(), label)
            } else {
                format!("{} {}", "x".red(), label)
            };
            bar.set_message(status);
            bar.inc(1);
        });
    }

    fn on_stage_complete(&self, stage: Stage) {
        let bar = self.stage_bar.lock().ok().and_then(|mut guard| guard.take());
        if let Some(bar) = bar {
            bar.finish_with_message(format!("Stage {} complete", stage.number()).green().to_string());
        }
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        let _ = self.multi.println(format!(
            "{} {} skipped: {}",
            "-".dimmed(),
            Self::stage_title(stage),
            reason
        ));
    }
}

/// Plain line-per-event progress on stderr (no bars)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::stage_title(stage).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _stage: Stage, label: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), label);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), label);
        }
    }

    fn on_stage_complete(&self, _stage: Stage) {
        eprintln!();
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        eprintln!(
            "{} {} skipped: {}",
            "-".dimmed(),
            ProgressReporter::stage_title(stage),
            reason
        );
    }
}
