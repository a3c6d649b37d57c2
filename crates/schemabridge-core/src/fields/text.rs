//! Text-like and boolean field validation

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

pub(crate) const TRUE_VALUES: &[&str] = &["t", "y", "yes", "true", "on", "1"];
pub(crate) const FALSE_VALUES: &[&str] = &["f", "n", "no", "false", "off", "0"];

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";
const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Length and blank-handling rules for text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub allow_blank: bool,
    pub trim_whitespace: bool,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            min_length: None,
            max_length: None,
            allow_blank: false,
            trim_whitespace: true,
        }
    }
}

impl TextRules {
    pub fn with_lengths(mut self, min_length: Option<usize>, max_length: Option<usize>) -> Self {
        self.min_length = min_length;
        self.max_length = max_length;
        self
    }

    pub fn allow_blank(mut self, allow_blank: bool) -> Self {
        self.allow_blank = allow_blank;
        self
    }

    /// Coerce and check text input.
    ///
    /// Returns `Ok(None)` for blank input that is allowed; later checks
    /// (patterns, formats) are skipped for it.
    pub(crate) fn check(&self, raw: &Value) -> Result<Option<String>, String> {
        let text = match raw {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            _ => return Err("Not a valid string.".to_string()),
        };
        let text = if self.trim_whitespace {
            text.trim().to_string()
        } else {
            text
        };

        if text.is_empty() {
            if self.allow_blank {
                return Ok(None);
            }
            return Err("This field may not be blank.".to_string());
        }

        let length = text.chars().count();
        if let Some(max_length) = self.max_length {
            if length > max_length {
                return Err(format!("Ensure this field has no more than {max_length} characters."));
            }
        }
        if let Some(min_length) = self.min_length {
            if length < min_length {
                return Err(format!("Ensure this field has at least {min_length} characters."));
            }
        }
        Ok(Some(text))
    }
}

pub(crate) fn to_boolean(raw: &Value) -> Result<Value, String> {
    let invalid = || "Must be a valid boolean.".to_string();
    match raw {
        Value::Bool(flag) => Ok(Value::Bool(*flag)),
        Value::String(text) => {
            let lowered = text.to_lowercase();
            if TRUE_VALUES.contains(&lowered.as_str()) {
                Ok(Value::Bool(true))
            } else if FALSE_VALUES.contains(&lowered.as_str()) {
                Ok(Value::Bool(false))
            } else {
                Err(invalid())
            }
        }
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 1.0 => Ok(Value::Bool(true)),
            Some(n) if n == 0.0 => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

pub(crate) fn to_text(rules: &TextRules, raw: &Value) -> Result<Value, String> {
    Ok(Value::String(rules.check(raw)?.unwrap_or_default()))
}

pub(crate) fn to_matching_text(rules: &TextRules, regex: &Regex, raw: &Value) -> Result<Value, String> {
    match rules.check(raw)? {
        Some(text) if regex.is_match(&text) => Ok(Value::String(text)),
        Some(_) => Err("This value does not match the required pattern.".to_string()),
        None => Ok(Value::String(String::new())),
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

pub(crate) fn to_email(rules: &TextRules, raw: &Value) -> Result<Value, String> {
    match rules.check(raw)? {
        Some(text) if email_regex().is_some_and(|regex| regex.is_match(&text)) => Ok(Value::String(text)),
        Some(_) => Err("Enter a valid email address.".to_string()),
        None => Ok(Value::String(String::new())),
    }
}

pub(crate) fn to_url(rules: &TextRules, raw: &Value) -> Result<Value, String> {
    let Some(text) = rules.check(raw)? else {
        return Ok(Value::String(String::new()));
    };
    match url::Url::parse(&text) {
        Ok(parsed) if URL_SCHEMES.contains(&parsed.scheme()) && parsed.host_str().is_some() => {
            Ok(Value::String(text))
        }
        _ => Err("Enter a valid URL.".to_string()),
    }
}

pub(crate) fn to_uuid(raw: &Value) -> Result<Value, String> {
    let invalid = || "Must be a valid UUID.".to_string();
    let text = raw.as_str().ok_or_else(invalid)?;
    uuid::Uuid::parse_str(text.trim())
        .map(|parsed| Value::String(parsed.hyphenated().to_string()))
        .map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_inputs() {
        assert_eq!(to_boolean(&json!("yes")), Ok(json!(true)));
        assert_eq!(to_boolean(&json!("OFF")), Ok(json!(false)));
        assert_eq!(to_boolean(&json!(1)), Ok(json!(true)));
        assert!(to_boolean(&json!("maybe")).is_err());
        assert!(to_boolean(&json!(2)).is_err());
    }

    #[test]
    fn test_text_rules() {
        let rules = TextRules::default().with_lengths(Some(2), Some(4));
        assert_eq!(to_text(&rules, &json!("  abc ")), Ok(json!("abc")));
        assert_eq!(to_text(&rules, &json!(69)), Ok(json!("69")));
        assert_eq!(
            to_text(&rules, &json!("abcde")),
            Err("Ensure this field has no more than 4 characters.".to_string())
        );
        assert_eq!(
            to_text(&rules, &json!("a")),
            Err("Ensure this field has at least 2 characters.".to_string())
        );
        assert_eq!(to_text(&rules, &json!("")), Err("This field may not be blank.".to_string()));
        assert_eq!(to_text(&rules, &json!(true)), Err("Not a valid string.".to_string()));
        assert_eq!(to_text(&rules.allow_blank(true), &json!("")), Ok(json!("")));
    }

    #[test]
    fn test_pattern() {
        let regex = Regex::new(r"^\d{3}$").unwrap();
        let rules = TextRules::default();
        assert_eq!(to_matching_text(&rules, &regex, &json!("123")), Ok(json!("123")));
        assert!(to_matching_text(&rules, &regex, &json!("12a")).is_err());
    }

    #[test]
    fn test_formats() {
        let rules = TextRules::default();
        assert!(to_email(&rules, &json!("van@example.com")).is_ok());
        assert!(to_email(&rules, &json!("not-an-email")).is_err());
        assert!(to_url(&rules, &json!("https://example.com/path")).is_ok());
        assert!(to_url(&rules, &json!("mailto:someone@example.com")).is_err());
        assert_eq!(
            to_uuid(&json!("A8098C1A-F86E-11DA-BD1A-00112444BE1E")),
            Ok(json!("a8098c1a-f86e-11da-bd1a-00112444be1e"))
        );
        assert!(to_uuid(&json!("nope")).is_err());
    }
}
