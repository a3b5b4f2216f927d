//! Progress notification port
//!
//! Defines the interface for reporting progress during a blocking council run.

use council_domain::Stage;

/// Callback for progress updates during a council run
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console spinners, web UI, etc.)
pub trait ProgressNotifier: Send + Sync {
    /// Called when a stage starts
    fn on_stage_start(&self, stage: Stage, total_tasks: usize);

    /// Called when one backend call within a stage completes.
    ///
    /// `label` is the provider id, or `reviewer -> target` in stage 2.
    fn on_task_complete(&self, stage: Stage, label: &str, success: bool);

    /// Called when a stage completes
    fn on_stage_complete(&self, stage: Stage);

    /// Called when a stage is skipped entirely
    fn on_stage_skipped(&self, _stage: Stage, _reason: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: Stage, _total_tasks: usize) {}
    fn on_task_complete(&self, _stage: Stage, _label: &str, _success: bool) {}
    fn on_stage_complete(&self, _stage: Stage) {}
}
