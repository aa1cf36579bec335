use std::fmt;

use crate::metric::Metric;
use crate::severity::{worst, Severity};

/// Outcome of evaluating one metric against its context.
///
/// Results are ephemeral: they are created per run and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    severity: Severity,
    hint: Option<String>,
    description: Option<String>,
    metric: Option<Metric>,
}

impl CheckResult {
    pub fn new(severity: Severity, hint: Option<String>, metric: Option<Metric>) -> Self {
        CheckResult {
            severity,
            hint,
            description: None,
            metric,
        }
    }

    pub(crate) fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn metric(&self) -> Option<&Metric> {
        self.metric.as_ref()
    }
}

impl fmt::Display for CheckResult {
    /// Textual explanation of the result: the metric description,
    /// optionally followed by the hint. The severity itself is rendered
    /// independently by the output layer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.description, &self.hint) {
            (Some(description), Some(hint)) => write!(f, "{} ({})", description, hint),
            (Some(description), None) => f.write_str(description),
            (None, Some(hint)) => f.write_str(hint),
            (None, None) => Ok(()),
        }
    }
}

/// Container for all results of one check run.
#[derive(Debug, Default)]
pub struct Results {
    results: Vec<CheckResult>,
}

impl Results {
    pub fn new() -> Self {
        Results::default()
    }

    pub fn add(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter()
    }

    /// Looks up the result for a metric by name.
    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|r| r.metric().is_some_and(|m| m.name() == name))
    }

    /// The overall severity: worst across all results, with Unknown
    /// dominant. An empty container aggregates to Unknown since nothing
    /// could be verified.
    pub fn worst_severity(&self) -> Severity {
        worst(self.results.iter().map(|r| r.severity()))
    }

    /// All results carrying the overall severity.
    pub fn most_significant(&self) -> Vec<&CheckResult> {
        if self.results.is_empty() {
            return Vec::new();
        }
        let severity = self.worst_severity();
        self.results
            .iter()
            .filter(|r| r.severity() == severity)
            .collect()
    }

    /// The first result carrying the overall severity.
    pub fn first_significant(&self) -> Option<&CheckResult> {
        self.most_significant().into_iter().next()
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a CheckResult;
    type IntoIter = std::slice::Iter<'a, CheckResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
