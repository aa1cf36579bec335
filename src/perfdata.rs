use std::fmt;

use crate::range::Range;

/// One performance-data sample for the perfdata section of the output.
///
/// Rendered as `label=value[uom];warn;crit;min;max` with trailing empty
/// fields omitted, the format monitoring consoles consume verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Perfdata {
    label: String,
    value: f64,
    uom: Option<String>,
    warning: Option<Range>,
    critical: Option<Range>,
    min: Option<f64>,
    max: Option<f64>,
}

impl Perfdata {
    pub fn new(
        label: impl Into<String>,
        value: f64,
        uom: Option<&str>,
        warning: Option<Range>,
        critical: Option<Range>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        // '=' and quotes cannot be escaped in the perfdata format
        let label = label
            .into()
            .chars()
            .filter(|c| *c != '=' && *c != '\'')
            .collect();
        Perfdata {
            label,
            value,
            uom: uom.map(str::to_string),
            warning,
            critical,
            min,
            max,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for Perfdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = vec![format!(
            "{}={}{}",
            quote(&self.label),
            self.value,
            self.uom.as_deref().unwrap_or("")
        )];
        fields.push(self.warning.as_ref().map(Range::to_string).unwrap_or_default());
        fields.push(self.critical.as_ref().map(Range::to_string).unwrap_or_default());
        fields.push(self.min.map(|v| v.to_string()).unwrap_or_default());
        fields.push(self.max.map(|v| v.to_string()).unwrap_or_default());
        while fields.last().is_some_and(|field| field.is_empty()) {
            fields.pop();
        }
        f.write_str(&fields.join(";"))
    }
}

/// Labels with anything beyond word characters must be quoted.
fn quote(label: &str) -> String {
    if !label.is_empty() && label.chars().all(|c| c.is_alphanumeric() || c == '_') {
        label.to_string()
    } else {
        format!("'{}'", label)
    }
}
