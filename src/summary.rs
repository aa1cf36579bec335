use crate::result::Results;
use crate::severity::Severity;

/// Renders the status line from the check's results.
///
/// The status line is the most important piece of text a check returns:
/// it must lead directly to the problem in the most concise way. The
/// default implementations are usable as-is; check authors implement
/// this trait when the output needs domain wording.
pub trait Summary: Send + Sync {
    /// Status line when the overall severity is Ok. Defaults to the
    /// first result in insertion order.
    fn ok(&self, results: &Results) -> String {
        results
            .iter()
            .next()
            .map(|r| r.to_string())
            .unwrap_or_default()
    }

    /// Status line when the overall severity is not Ok. Defaults to the
    /// first result carrying the most significant severity.
    fn problem(&self, results: &Results) -> String {
        results
            .first_significant()
            .map(|r| r.to_string())
            .unwrap_or_default()
    }

    /// Additional output lines for verbose execution. Defaults to one
    /// line per result in a non-Ok state.
    fn verbose(&self, results: &Results) -> Vec<String> {
        results
            .iter()
            .filter(|r| r.severity() != Severity::Ok)
            .map(|r| format!("{}: {}", r.severity(), r))
            .collect()
    }

    /// Status line when the result set is empty.
    fn empty(&self) -> String {
        "no check results".to_string()
    }
}

/// The stock presentation used unless a check installs its own.
#[derive(Debug, Default)]
pub struct DefaultSummary;

impl Summary for DefaultSummary {}
