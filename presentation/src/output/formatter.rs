//! Output formatter trait

use council_domain::CouncilResult;

/// Trait for formatting council results
pub trait OutputFormatter {
    /// Format every stage of the result
    fn format(&self, result: &CouncilResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &CouncilResult) -> String;

    /// Format the synthesis only (concise output)
    fn format_synthesis_only(&self, result: &CouncilResult) -> String;
}
