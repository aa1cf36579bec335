use std::fmt;
use std::str::FromStr;

use crate::error::CheckError;

/// A threshold range parsed from the compact plugin notation.
///
/// The general format is `[@][start:][end]`. A bare number `N` is
/// shorthand for `0:N`. An empty or `~` lower bound means negative
/// infinity, an empty upper bound means positive infinity. A leading
/// `@` inverts the alert condition: the value alerts when it falls
/// *inside* the bounds instead of outside.
///
/// A `Range` is immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    start: f64,
    end: f64,
    invert: bool,
}

impl Range {
    /// Parses a range specification.
    ///
    /// Fails with [`CheckError::Syntax`] on an empty string, malformed
    /// bounds or separators, and bounds where start exceeds end.
    pub fn parse(spec: &str) -> Result<Self, CheckError> {
        if spec.is_empty() {
            return Err(CheckError::syntax(spec, "empty range specification"));
        }
        let (invert, body) = match spec.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, spec),
        };
        if body.is_empty() {
            return Err(CheckError::syntax(spec, "missing bounds"));
        }
        let (start, end) = match body.split_once(':') {
            Some((start_str, end_str)) => {
                let start = match start_str {
                    "" | "~" => f64::NEG_INFINITY,
                    _ => parse_bound(spec, start_str)?,
                };
                let end = match end_str {
                    "" => f64::INFINITY,
                    _ => parse_bound(spec, end_str)?,
                };
                (start, end)
            }
            None => (0.0, parse_bound(spec, body)?),
        };
        if start > end {
            return Err(CheckError::syntax(
                spec,
                format!("start {} must not be greater than end {}", start, end),
            ));
        }
        Ok(Range { start, end, invert })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    /// Decides whether `value` triggers an alert.
    ///
    /// Pure and total: identical inputs always yield identical results
    /// and there is no failure mode. Default semantics alert when the
    /// value lies outside `[start, end]`; inverted semantics alert when
    /// it lies inside. A non-finite value always alerts, since a value
    /// that cannot be measured is worse than one that is out of range.
    pub fn matches(&self, value: f64) -> bool {
        if !value.is_finite() {
            return true;
        }
        let inside = value >= self.start && value <= self.end;
        if self.invert {
            inside
        } else {
            !inside
        }
    }

    /// Human-readable description of why a value does not match.
    pub fn violation(&self) -> String {
        if self.invert {
            format!("inside range {}", self.full_spec())
        } else {
            format!("outside range {}", self.full_spec())
        }
    }

    /// Range notation with the lower bound always written out.
    fn full_spec(&self) -> String {
        let mut out = String::new();
        if self.start == f64::NEG_INFINITY {
            out.push_str("~:");
        } else {
            out.push_str(&format!("{}:", fmt_bound(self.start)));
        }
        if self.end != f64::INFINITY {
            out.push_str(&fmt_bound(self.end));
        }
        out
    }
}

impl FromStr for Range {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Range::parse(s)
    }
}

impl fmt::Display for Range {
    /// Renders the range in parseable notation, omitting a zero lower
    /// bound as the grammar allows.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invert {
            f.write_str("@")?;
        }
        if self.start == f64::NEG_INFINITY {
            f.write_str("~:")?;
        } else if self.start != 0.0 {
            write!(f, "{}:", fmt_bound(self.start))?;
        } else if self.end == f64::INFINITY {
            // "0:" needs the separator to stay parseable
            f.write_str("0:")?;
        }
        if self.end != f64::INFINITY {
            write!(f, "{}", fmt_bound(self.end))?;
        }
        Ok(())
    }
}

fn parse_bound(spec: &str, atom: &str) -> Result<f64, CheckError> {
    let value: f64 = atom
        .parse()
        .map_err(|_| CheckError::syntax(spec, format!("'{}' is not a number", atom)))?;
    if !value.is_finite() {
        return Err(CheckError::syntax(
            spec,
            format!("'{}' is not a finite number", atom),
        ));
    }
    Ok(value)
}

fn fmt_bound(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(spec: &str) -> Range {
        Range::parse(spec).unwrap()
    }

    #[test]
    fn test_bare_number_means_zero_to_number() {
        let r = range("10");
        assert_eq!(r.start(), 0.0);
        assert_eq!(r.end(), 10.0);
        assert!(!r.is_inverted());
        assert!(r.matches(15.0));
        assert!(!r.matches(5.0));
        assert!(r.matches(-1.0));
    }

    #[test]
    fn test_closed_interval() {
        let r = range("10:20");
        assert!(r.matches(25.0));
        assert!(!r.matches(15.0));
        assert!(r.matches(5.0));
        assert!(!r.matches(10.0));
        assert!(!r.matches(20.0));
    }

    #[test]
    fn test_inverted_alerts_inside() {
        let r = range("@10:20");
        assert!(r.matches(15.0));
        assert!(!r.matches(25.0));
        assert!(r.matches(10.0));
        assert!(r.matches(20.0));
    }

    #[test]
    fn test_lower_bound_only_means_at_least() {
        let r = range("10:");
        assert!(r.matches(5.0));
        assert!(!r.matches(10.0));
        assert!(!r.matches(1000.0));
    }

    #[test]
    fn test_open_low_marker() {
        let r = range("~:10");
        assert_eq!(r.start(), f64::NEG_INFINITY);
        assert!(!r.matches(-1000.0));
        assert!(r.matches(10.5));
    }

    #[test]
    fn test_empty_lower_bound_means_at_most() {
        let r = range(":10");
        assert_eq!(r.start(), f64::NEG_INFINITY);
        assert!(!r.matches(-1000.0));
        assert!(r.matches(11.0));
    }

    #[test]
    fn test_negative_and_decimal_bounds() {
        let r = range("-10.5:-0.5");
        assert!(!r.matches(-5.0));
        assert!(r.matches(0.0));
        assert!(r.matches(-11.0));
    }

    #[test]
    fn test_non_finite_value_alerts() {
        let r = range("0:");
        assert!(r.matches(f64::NAN));
        assert!(r.matches(f64::INFINITY));
        let inverted = range("@10:20");
        assert!(inverted.matches(f64::NAN));
    }

    #[test]
    fn test_empty_spec_is_an_error() {
        assert!(Range::parse("").is_err());
        assert!(Range::parse("@").is_err());
    }

    #[test]
    fn test_malformed_specs_are_errors() {
        assert!(Range::parse("1:2:3").is_err());
        assert!(Range::parse("abc").is_err());
        assert!(Range::parse("1:abc").is_err());
        assert!(Range::parse("nan:5").is_err());
        assert!(Range::parse("inf").is_err());
    }

    #[test]
    fn test_start_greater_than_end_is_an_error() {
        assert!(Range::parse("20:10").is_err());
        assert!(Range::parse("10:10").is_ok());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["10", "10:20", "@10:20", "-5:5", "~:3", "2:", "0:", "1.5:2.5"] {
            let original = range(spec);
            let reparsed = range(&original.to_string());
            assert_eq!(original, reparsed, "round trip failed for '{}'", spec);
        }
    }

    #[test]
    fn test_display_omits_zero_start() {
        assert_eq!(range("0:10").to_string(), "10");
        assert_eq!(range("10:20").to_string(), "10:20");
        assert_eq!(range("@0:10").to_string(), "@10");
    }

    #[test]
    fn test_violation_text() {
        assert_eq!(range("10").violation(), "outside range 0:10");
        assert_eq!(range("5:").violation(), "outside range 5:");
        assert_eq!(range("@10:20").violation(), "inside range 10:20");
    }

    #[test]
    fn test_matcher_is_deterministic() {
        let r = range("3:7");
        for _ in 0..3 {
            assert!(!r.matches(5.0));
            assert!(r.matches(8.0));
        }
    }
}
