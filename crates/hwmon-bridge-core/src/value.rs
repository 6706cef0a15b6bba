//! Coercion of loosely-typed readings into numbers.
//!
//! Hardware monitors report readings as display strings such as `"42.5 °C"`
//! or `"3.80 GHz"`, and occasionally as bare JSON numbers.

use serde_json::Value;

/// A raw scalar reading as it appears in a sensor node.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// A display string, usually a number followed by a unit.
    Text(String),
    /// A bare number.
    Number(f64),
}

impl Reading {
    /// Extracts a reading from a JSON value.
    ///
    /// Strings and numbers are kept, everything else (null, booleans, arrays,
    /// objects) is treated as absent.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Reading::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(Reading::Number),
            _ => None,
        }
    }
}

impl From<&str> for Reading {
    fn from(s: &str) -> Self {
        Reading::Text(s.to_string())
    }
}

impl From<f64> for Reading {
    fn from(n: f64) -> Self {
        Reading::Number(n)
    }
}

/// Converts an optional reading into a number.
///
/// The first whitespace-delimited token of the reading is parsed as a float.
/// Returns `None` when the reading is absent, empty, not numeric, or not
/// finite.
pub fn coerce(reading: Option<&Reading>) -> Option<f64> {
    let value = match reading? {
        Reading::Number(n) => *n,
        Reading::Text(s) => s.split_whitespace().next()?.parse::<f64>().ok()?,
    };

    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(s: &str) -> Option<f64> {
        coerce(Some(&Reading::from(s)))
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(text("42.5 °C"), Some(42.5));
        assert_eq!(text("3.80 GHz"), Some(3.8));
        assert_eq!(text("1200 RPM"), Some(1200.0));
    }

    #[test]
    fn test_absent_and_empty() {
        assert_eq!(coerce(None), None);
        assert_eq!(text(""), None);
        assert_eq!(text("   "), None);
    }

    #[test]
    fn test_non_numeric() {
        assert_eq!(text("abc"), None);
        assert_eq!(text("°C 42"), None);
        // Unit glued to the number is not a valid token.
        assert_eq!(text("42.5°C"), None);
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(text("-12.25 °C"), Some(-12.25));
        assert_eq!(text("1e3 W"), Some(1000.0));
        assert_eq!(text("  7.5  %"), Some(7.5));
        assert_eq!(coerce(Some(&Reading::Number(37.0))), Some(37.0));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert_eq!(text("NaN"), None);
        assert_eq!(text("inf °C"), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(
            Reading::from_json(&json!("1.2 V")),
            Some(Reading::Text("1.2 V".to_string()))
        );
        assert_eq!(Reading::from_json(&json!(37)), Some(Reading::Number(37.0)));
        assert_eq!(Reading::from_json(&json!(null)), None);
        assert_eq!(Reading::from_json(&json!(true)), None);
        assert_eq!(Reading::from_json(&json!([1, 2])), None);
    }
}
