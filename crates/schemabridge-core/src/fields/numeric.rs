//! Numeric field validation

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

const INTEGER_REQUIRED: &str = "A valid integer is required.";
const NUMBER_REQUIRED: &str = "A valid number is required.";
/// Longest decimal rendered in plain notation
const MAX_CANONICAL_DIGITS: u64 = 4096;

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NumericBounds {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl NumericBounds {
    pub fn new(min_value: Option<f64>, max_value: Option<f64>) -> Self {
        Self { min_value, max_value }
    }

    pub(crate) fn check(&self, value: f64) -> Result<(), String> {
        if let Some(max_value) = self.max_value {
            if value > max_value {
                return Err(format!("Ensure this value is less than or equal to {max_value}."));
            }
        }
        if let Some(min_value) = self.min_value {
            if value < min_value {
                return Err(format!("Ensure this value is greater than or equal to {min_value}."));
            }
        }
        Ok(())
    }
}

fn integer_text() -> Option<&'static Regex> {
    static INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
    INTEGER
        .get_or_init(|| Regex::new(r"^([+-]?\d+)(?:\.0*)?$").ok())
        .as_ref()
}

fn decimal_text() -> Option<&'static Regex> {
    static DECIMAL: OnceLock<Option<Regex>> = OnceLock::new();
    DECIMAL
        .get_or_init(|| Regex::new(r"^([+-])?(\d*)(?:\.(\d*))?(?:[eE]([+-]?\d+))?$").ok())
        .as_ref()
}

pub(crate) fn to_integer(bounds: &NumericBounds, raw: &Value) -> Result<Value, String> {
    let invalid = || INTEGER_REQUIRED.to_string();
    let value: i64 = match raw {
        Value::Number(number) => match number.as_i64() {
            Some(value) => value,
            None => match number.as_f64() {
                Some(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => value as i64,
                _ => return Err(invalid()),
            },
        },
        Value::String(text) => {
            let captures = integer_text()
                .and_then(|regex| regex.captures(text.trim()))
                .ok_or_else(invalid)?;
            captures
                .get(1)
                .and_then(|digits| digits.as_str().parse::<i64>().ok())
                .ok_or_else(invalid)?
        }
        _ => return Err(invalid()),
    };
    bounds.check(value as f64)?;
    Ok(Value::from(value))
}

pub(crate) fn to_float(bounds: &NumericBounds, raw: &Value) -> Result<Value, String> {
    let invalid = || NUMBER_REQUIRED.to_string();
    let value = match raw {
        Value::Number(number) => number.as_f64().ok_or_else(invalid)?,
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    if !value.is_finite() {
        return Err(invalid());
    }
    bounds.check(value)?;
    Ok(Value::from(value))
}

/// A decimal literal split into sign, significant digits and exponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecimalParts {
    negative: bool,
    digits: String,
    exponent: i64,
}

impl DecimalParts {
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let captures = decimal_text()?.captures(text.trim())?;
        let integer = captures.get(2).map_or("", |m| m.as_str());
        let fraction = captures.get(3).map_or("", |m| m.as_str());
        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        let exponent: i64 = match captures.get(4) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };

        let exponent = exponent.checked_sub(i64::try_from(fraction.len()).ok()?)?;

        let combined = format!("{integer}{fraction}");
        let trimmed = combined.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        let negative = captures.get(1).is_some_and(|m| m.as_str() == "-") && digits != "0";

        Some(Self {
            negative,
            digits: digits.to_string(),
            exponent,
        })
    }

    /// (total digits, whole digits, decimal places)
    pub(crate) fn digit_counts(&self) -> (u64, u64, u64) {
        let len = self.digits.len() as u64;
        if self.exponent >= 0 {
            let total = if self.digits == "0" { 1 } else { len.saturating_add(self.exponent as u64) };
            (total, total, 0)
        } else {
            let places = self.exponent.unsigned_abs();
            if len > places {
                (len, len - places, places)
            } else {
                (places, 0, places)
            }
        }
    }

    pub(crate) fn canonical(&self) -> String {
        let sign = if self.negative { "-" } else { "" };
        if self.exponent >= 0 {
            if self.digits == "0" {
                return "0".to_string();
            }
            return format!("{sign}{}{}", self.digits, "0".repeat(self.exponent as usize));
        }
        let places = self.exponent.unsigned_abs() as usize;
        if self.digits.len() > places {
            let (whole, fraction) = self.digits.split_at(self.digits.len() - places);
            format!("{sign}{whole}.{fraction}")
        } else {
            format!("{sign}0.{}{}", "0".repeat(places - self.digits.len()), self.digits)
        }
    }
}

pub(crate) fn to_decimal(
    bounds: &NumericBounds,
    max_digits: Option<u32>,
    decimal_places: Option<u32>,
    raw: &Value,
) -> Result<Value, String> {
    let invalid = || NUMBER_REQUIRED.to_string();
    let text = match raw {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        _ => return Err(invalid()),
    };
    let parts = DecimalParts::parse(&text).ok_or_else(invalid)?;
    let (total, whole, places) = parts.digit_counts();

    if let Some(max_digits) = max_digits {
        if total > u64::from(max_digits) {
            return Err(format!("Ensure that there are no more than {max_digits} digits in total."));
        }
    }
    if let Some(decimal_places) = decimal_places {
        if places > u64::from(decimal_places) {
            return Err(format!(
                "Ensure that there are no more than {decimal_places} decimal places."
            ));
        }
    }
    if let (Some(max_digits), Some(decimal_places)) = (max_digits, decimal_places) {
        // an equal budget would leave no room for whole digits at all
        if decimal_places < max_digits {
            let max_whole = u64::from(max_digits - decimal_places);
            if whole > max_whole {
                return Err(format!(
                    "Ensure that there are no more than {max_whole} digits before the decimal point."
                ));
            }
        }
    }

    if total > MAX_CANONICAL_DIGITS {
        return Err(invalid());
    }

    let canonical = parts.canonical();
    let numeric = canonical.parse::<f64>().map_err(|_| invalid())?;
    bounds.check(numeric)?;
    Ok(Value::String(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_inputs() {
        let bounds = NumericBounds::default();
        assert_eq!(to_integer(&bounds, &json!(69)), Ok(json!(69)));
        assert_eq!(to_integer(&bounds, &json!("69")), Ok(json!(69)));
        assert_eq!(to_integer(&bounds, &json!("69.0")), Ok(json!(69)));
        assert_eq!(to_integer(&bounds, &json!(69.0)), Ok(json!(69)));
        assert!(to_integer(&bounds, &json!(69.5)).is_err());
        assert!(to_integer(&bounds, &json!("abc")).is_err());
        assert!(to_integer(&bounds, &json!(true)).is_err());
    }

    #[test]
    fn test_integer_bounds() {
        let bounds = NumericBounds::new(Some(0.0), Some(100.0));
        assert_eq!(
            to_integer(&bounds, &json!(-1)),
            Err("Ensure this value is greater than or equal to 0.".to_string())
        );
        assert_eq!(
            to_integer(&bounds, &json!(101)),
            Err("Ensure this value is less than or equal to 100.".to_string())
        );
    }

    #[test]
    fn test_float_inputs() {
        let bounds = NumericBounds::default();
        assert_eq!(to_float(&bounds, &json!("1.5")), Ok(json!(1.5)));
        assert!(to_float(&bounds, &json!("nan")).is_err());
        assert!(to_float(&bounds, &json!(false)).is_err());
    }

    #[test]
    fn test_decimal_digit_counts() {
        assert_eq!(DecimalParts::parse("123.45").unwrap().digit_counts(), (5, 3, 2));
        assert_eq!(DecimalParts::parse("0.001").unwrap().digit_counts(), (3, 0, 3));
        assert_eq!(DecimalParts::parse("1200").unwrap().digit_counts(), (4, 4, 0));
        assert_eq!(DecimalParts::parse("1.2e3").unwrap().digit_counts(), (4, 4, 0));
        assert_eq!(DecimalParts::parse("007").unwrap().canonical(), "7");
        assert_eq!(DecimalParts::parse("-0.50").unwrap().canonical(), "-0.50");
        assert!(DecimalParts::parse(".").is_none());
        assert!(DecimalParts::parse("1.5e-9223372036854775808").is_none());
    }

    #[test]
    fn test_decimal_precision() {
        let bounds = NumericBounds::default();
        assert_eq!(to_decimal(&bounds, Some(5), Some(2), &json!("123.45")), Ok(json!("123.45")));
        assert_eq!(
            to_decimal(&bounds, Some(5), Some(2), &json!("1234.5")),
            Err("Ensure that there are no more than 3 digits before the decimal point.".to_string())
        );
        assert_eq!(
            to_decimal(&bounds, Some(5), Some(2), &json!("1.234")),
            Err("Ensure that there are no more than 2 decimal places.".to_string())
        );
        assert_eq!(
            to_decimal(&bounds, Some(3), None, &json!("1234")),
            Err("Ensure that there are no more than 3 digits in total.".to_string())
        );
        // equal digit budgets accept whole numbers
        assert_eq!(to_decimal(&bounds, Some(28), Some(28), &json!(42)), Ok(json!("42")));
    }

    #[test]
    fn test_decimal_extreme_exponents() {
        let bounds = NumericBounds::default();
        let invalid = Err(NUMBER_REQUIRED.to_string());
        assert_eq!(to_decimal(&bounds, Some(28), Some(28), &json!("1.5e-9223372036854775808")), invalid);
        assert_eq!(to_decimal(&bounds, None, None, &json!("1e9223372036854775807")), invalid);
        assert_eq!(to_decimal(&bounds, None, None, &json!("1e-100000")), invalid);
        assert_eq!(to_decimal(&bounds, None, None, &json!("1.5e2")), Ok(json!("150")));
    }
}
