use log::debug;

use crate::error::CheckError;
use crate::metric::Metric;
use crate::perfdata::Perfdata;
use crate::range::Range;
use crate::result::CheckResult;
use crate::severity::Severity;

const DEFAULT_FMT: &str = "{name} is {valueunit}";

/// Binds a metric name to warning and critical thresholds.
///
/// Evaluation is a fixed two-tier escalation: the critical range is
/// consulted first, then the warning range, otherwise the metric is Ok.
/// A metric whose value is missing evaluates to Unknown without any
/// range being consulted.
#[derive(Debug, Clone)]
pub struct Context {
    name: String,
    warning: Option<Range>,
    critical: Option<Range>,
    fmt: Option<String>,
    perfdata: bool,
}

impl Context {
    /// A context without thresholds; associated metrics always evaluate
    /// to Ok but still emit performance data.
    pub fn new(name: impl Into<String>) -> Self {
        Context {
            name: name.into(),
            warning: None,
            critical: None,
            fmt: Some(DEFAULT_FMT.to_string()),
            perfdata: true,
        }
    }

    /// Sets the warning range. Fails fast on a malformed specification,
    /// before any run proceeds.
    pub fn warning(mut self, spec: &str) -> Result<Self, CheckError> {
        self.warning = Some(Range::parse(spec)?);
        Ok(self)
    }

    /// Sets the critical range. Fails fast on a malformed specification.
    pub fn critical(mut self, spec: &str) -> Result<Self, CheckError> {
        self.critical = Some(Range::parse(spec)?);
        Ok(self)
    }

    /// Template for the human-readable metric description. Supported
    /// placeholders: `{name}`, `{value}`, `{valueunit}`, `{uom}`.
    pub fn fmt(mut self, template: impl Into<String>) -> Self {
        self.fmt = Some(template.into());
        self
    }

    /// Suppresses performance data for metrics evaluated in this
    /// context.
    pub fn without_perfdata(mut self) -> Self {
        self.perfdata = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn warning_range(&self) -> Option<&Range> {
        self.warning.as_ref()
    }

    pub fn critical_range(&self) -> Option<&Range> {
        self.critical.as_ref()
    }

    /// Evaluates a metric against the thresholds.
    pub fn evaluate(&self, metric: &Metric) -> CheckResult {
        let Some(value) = metric.value() else {
            return CheckResult::new(
                Severity::Unknown,
                Some(format!("cannot determine {}", metric.name())),
                Some(metric.clone()),
            );
        };
        let (severity, hint) = if let Some(range) = self.critical.as_ref().filter(|r| r.matches(value)) {
            (Severity::Critical, Some(range.violation()))
        } else if let Some(range) = self.warning.as_ref().filter(|r| r.matches(value)) {
            (Severity::Warning, Some(range.violation()))
        } else {
            (Severity::Ok, None)
        };
        debug!("{}: {} evaluates to {}", self.name, metric.name(), severity);
        CheckResult::new(severity, hint, Some(metric.clone())).with_description(self.describe(metric))
    }

    /// Derives performance data for a metric evaluated in this context.
    pub fn performance(&self, metric: &Metric) -> Option<Perfdata> {
        if !self.perfdata {
            return None;
        }
        let value = metric.value()?;
        Some(Perfdata::new(
            metric.name(),
            value,
            metric.uom(),
            self.warning.clone(),
            self.critical.clone(),
            metric.min(),
            metric.max(),
        ))
    }

    /// Formats the metric according to the context's template.
    pub fn describe(&self, metric: &Metric) -> Option<String> {
        let template = self.fmt.as_ref()?;
        Some(
            template
                .replace("{name}", metric.name())
                .replace("{valueunit}", &metric.value_unit())
                .replace(
                    "{value}",
                    &metric
                        .value()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                )
                .replace("{uom}", metric.uom().unwrap_or("")),
        )
    }
}

/// Insertion-ordered registry of the contexts a check owns.
///
/// Two contexts are always available without registration: `default`
/// evaluates everything to Ok with performance data, `null` evaluates to
/// Ok and emits nothing. Registering a context under one of those names
/// shadows the built-in.
#[derive(Debug)]
pub struct Contexts {
    entries: Vec<Context>,
    default_context: Context,
    null_context: Context,
}

impl Contexts {
    pub fn new() -> Self {
        Contexts {
            entries: Vec::new(),
            default_context: Context::new("default"),
            null_context: Context::new("null").without_perfdata(),
        }
    }

    /// Registers a context. Metric names must be unique within a check
    /// run; registering a duplicate is a configuration error.
    pub fn add(&mut self, context: Context) -> Result<(), CheckError> {
        if self.entries.iter().any(|c| c.name() == context.name()) {
            return Err(CheckError::Config(format!(
                "duplicate context '{}'",
                context.name()
            )));
        }
        self.entries.push(context);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Context> {
        if let Some(context) = self.entries.iter().find(|c| c.name() == name) {
            return Some(context);
        }
        match name {
            "default" => Some(&self.default_context),
            "null" => Some(&self.null_context),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over registered contexts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.entries.iter()
    }
}

impl Default for Contexts {
    fn default() -> Self {
        Contexts::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context {
        Context::new("load").warning("80").unwrap().critical("90").unwrap()
    }

    #[test]
    fn test_value_between_warning_and_critical_is_warning() {
        let result = context().evaluate(&Metric::new("load", 85.0));
        assert_eq!(result.severity(), Severity::Warning);
        assert_eq!(result.hint(), Some("outside range 0:80"));
    }

    #[test]
    fn test_critical_dominates_warning() {
        let result = context().evaluate(&Metric::new("load", 95.0));
        assert_eq!(result.severity(), Severity::Critical);
        assert_eq!(result.hint(), Some("outside range 0:90"));
    }

    #[test]
    fn test_value_inside_both_ranges_is_ok() {
        let result = context().evaluate(&Metric::new("load", 42.0));
        assert_eq!(result.severity(), Severity::Ok);
        assert_eq!(result.hint(), None);
    }

    #[test]
    fn test_missing_value_is_unknown_without_consulting_ranges() {
        let result = context().evaluate(&Metric::missing("load"));
        assert_eq!(result.severity(), Severity::Unknown);
        assert_eq!(result.hint(), Some("cannot determine load"));
    }

    #[test]
    fn test_context_without_thresholds_is_always_ok() {
        let result = Context::new("info").evaluate(&Metric::new("info", 1e9));
        assert_eq!(result.severity(), Severity::Ok);
    }

    #[test]
    fn test_describe_template() {
        let context = Context::new("time").fmt("{name} took {valueunit}");
        let metric = Metric::new("time", 3.0).with_uom("s");
        assert_eq!(context.describe(&metric), Some("time took 3s".to_string()));
    }

    #[test]
    fn test_performance_respects_suppression() {
        let metric = Metric::new("load", 1.0);
        assert!(Context::new("load").performance(&metric).is_some());
        assert!(Context::new("load").without_perfdata().performance(&metric).is_none());
    }

    #[test]
    fn test_duplicate_registration_is_a_configuration_error() {
        let mut contexts = Contexts::new();
        contexts.add(Context::new("load")).unwrap();
        let err = contexts.add(Context::new("load")).unwrap_err();
        assert!(matches!(err, CheckError::Config(_)));
    }

    #[test]
    fn test_builtin_contexts_are_available() {
        let contexts = Contexts::new();
        assert!(contexts.contains("default"));
        assert!(contexts.contains("null"));
        assert!(!contexts.contains("load"));
    }

    #[test]
    fn test_malformed_range_fails_at_configuration_time() {
        assert!(Context::new("load").warning("20:10").is_err());
    }
}
