use log::{debug, warn};

use crate::context::{Context, Contexts};
use crate::error::CheckError;
use crate::resource::Resource;
use crate::result::{CheckResult, Results};
use crate::severity::Severity;
use crate::summary::{DefaultSummary, Summary};

/// Stage of a check run, advanced by [`Check::run`] and the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Acquiring,
    Evaluating,
    Presenting,
    Done,
    TimedOut,
    Failed,
}

/// Orchestrates one check run: acquisition over all resources, then
/// evaluation of the returned metrics against their contexts.
///
/// A run is all-or-nothing; the check never retries. Retries, if any,
/// are the invoking scheduler's concern.
pub struct Check {
    name: String,
    resources: Vec<Box<dyn Resource>>,
    contexts: Contexts,
    summary: Box<dyn Summary>,
    results: Results,
    perfdata: Vec<String>,
    phase: RunPhase,
}

impl Check {
    /// Creates a check. An empty name is replaced by the first
    /// resource's name, which becomes the status line prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Check {
            name: name.into(),
            resources: Vec::new(),
            contexts: Contexts::new(),
            summary: Box::new(DefaultSummary),
            results: Results::new(),
            perfdata: Vec::new(),
            phase: RunPhase::Idle,
        }
    }

    pub fn resource(mut self, resource: impl Resource + 'static) -> Self {
        if self.name.is_empty() {
            self.name = resource.name().to_string();
        }
        self.resources.push(Box::new(resource));
        self
    }

    /// Registers a context. Duplicate names are a configuration error.
    pub fn context(mut self, context: Context) -> Result<Self, CheckError> {
        self.contexts.add(context)?;
        Ok(self)
    }

    pub fn summary(mut self, summary: impl Summary + 'static) -> Self {
        self.summary = Box::new(summary);
        self
    }

    /// Probes all resources and evaluates the returned metrics.
    ///
    /// An acquisition error from one resource is converted into an
    /// Unknown result carrying the error text; the remaining resources
    /// still run. A metric referring to an unregistered context aborts
    /// the run, since that is a mistake in the check's configuration.
    pub async fn run(&mut self) -> Result<(), CheckError> {
        self.phase = RunPhase::Acquiring;
        debug!("acquiring metrics from {} resources", self.resources.len());
        let mut metrics = Vec::new();
        for resource in &self.resources {
            match resource.probe().await {
                Ok(probed) => {
                    if probed.is_empty() {
                        warn!("resource {} did not produce any metric", resource.name());
                    }
                    metrics.extend(probed);
                }
                Err(e) => {
                    warn!("resource {} failed: {}", resource.name(), e);
                    self.results
                        .add(CheckResult::new(Severity::Unknown, Some(e.to_string()), None));
                }
            }
        }

        self.phase = RunPhase::Evaluating;
        for metric in metrics {
            let context = self.contexts.get(metric.context_name()).ok_or_else(|| {
                CheckError::Config(format!(
                    "no context named '{}' for metric '{}'",
                    metric.context_name(),
                    metric.name()
                ))
            })?;
            if let Some(perfdata) = context.performance(&metric) {
                self.perfdata.push(perfdata.to_string());
            }
            self.results.add(context.evaluate(&metric));
        }
        self.perfdata.sort();

        self.phase = RunPhase::Presenting;
        Ok(())
    }

    /// Overall severity: the worst result seen, Unknown if the run
    /// produced no results at all.
    pub fn severity(&self) -> Severity {
        self.results.worst_severity()
    }

    /// Exit code for the invoking monitoring system.
    pub fn exit_code(&self) -> i32 {
        self.severity().exit_code()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn perfdata(&self) -> &[String] {
        &self.perfdata
    }

    /// First line of output: `NAME SEVERITY - summary`.
    pub fn status_line(&self) -> String {
        let prefix = if self.name.is_empty() {
            String::new()
        } else {
            format!("{} ", self.name.to_uppercase())
        };
        let summary = self.summary_text();
        let summary = summary.trim();
        if summary.is_empty() {
            format!("{}{}", prefix, self.severity().text().to_uppercase())
        } else {
            format!(
                "{}{} - {}",
                prefix,
                self.severity().text().to_uppercase(),
                summary
            )
        }
    }

    /// Additional output lines for verbose execution.
    pub fn verbose_lines(&self) -> Vec<String> {
        self.summary.verbose(&self.results)
    }

    fn summary_text(&self) -> String {
        if self.results.is_empty() {
            return self.summary.empty();
        }
        if self.severity() == Severity::Ok {
            self.summary.ok(&self.results)
        } else {
            self.summary.problem(&self.results)
        }
    }
}
