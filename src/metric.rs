use std::fmt;

/// A single measured value produced during acquisition.
///
/// Values should be expressed in base units, so `Metric::new("swap",
/// 10240.0).with_uom("B")` is better than a metric counting kiB. The
/// optional min/max describe the measured domain and are only used for
/// performance-data rendering, never for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    name: String,
    value: Option<f64>,
    uom: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
    context: Option<String>,
}

impl Metric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Metric {
            name: name.into(),
            value: Some(value),
            uom: None,
            min: None,
            max: None,
            context: None,
        }
    }

    /// A metric whose measurement could not be produced. Evaluates to
    /// Unknown severity without consulting any range.
    pub fn missing(name: impl Into<String>) -> Self {
        Metric {
            name: name.into(),
            value: None,
            uom: None,
            min: None,
            max: None,
            context: None,
        }
    }

    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.uom = Some(uom.into());
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Associates the metric with a context other than the one named
    /// after the metric itself.
    pub fn for_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn uom(&self) -> Option<&str> {
        self.uom.as_deref()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Name of the context this metric is evaluated in. Defaults to the
    /// metric's own name.
    pub fn context_name(&self) -> &str {
        self.context.as_deref().unwrap_or(&self.name)
    }

    /// Compact value-plus-unit representation, e.g. `1300ms`.
    pub fn value_unit(&self) -> String {
        match self.value {
            Some(value) => format!("{}{}", fmt_value(value), self.uom.as_deref().unwrap_or("")),
            None => "unknown".to_string(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value_unit())
    }
}

/// Limits the number of digits printed for fractional values.
fn fmt_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        let formatted = format!("{:.4}", value);
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
