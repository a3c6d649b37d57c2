//! Date, time and duration field validation

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub(crate) fn to_date(raw: &Value) -> Result<Value, String> {
    let invalid = || "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_string();
    let text = raw.as_str().ok_or_else(invalid)?;
    let date = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    Ok(Value::String(date.format("%Y-%m-%d").to_string()))
}

pub(crate) fn to_time(raw: &Value) -> Result<Value, String> {
    let invalid = || "Time has wrong format. Use one of these formats instead: hh:mm[:ss[.uuuuuu]].".to_string();
    let text = raw.as_str().ok_or_else(invalid)?.trim();
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .ok_or_else(invalid)?;
    Ok(Value::String(time.format("%H:%M:%S%.f").to_string()))
}

pub(crate) fn to_datetime(raw: &Value) -> Result<Value, String> {
    let invalid = || {
        "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z]."
            .to_string()
    };
    let text = raw.as_str().ok_or_else(invalid)?.trim();

    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(Value::String(aware.to_rfc3339_opts(SecondsFormat::AutoSi, true)));
    }
    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(invalid)?;
    Ok(Value::String(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
}

fn clock_duration() -> Option<&'static Regex> {
    static CLOCK: OnceLock<Option<Regex>> = OnceLock::new();
    CLOCK
        .get_or_init(|| {
            Regex::new(r"^(?:(-?\d+) days?,? )?(-?)(?:(\d+):)?(?:(\d+):)?(\d+)(?:[.,](\d{1,6})\d*)?$").ok()
        })
        .as_ref()
}

fn iso_duration() -> Option<&'static Regex> {
    static ISO: OnceLock<Option<Regex>> = OnceLock::new();
    ISO.get_or_init(|| {
        Regex::new(
            r"^([-+]?)P(?:(\d+(?:[.,]\d+)?)D)?(?:T(?:(\d+(?:[.,]\d+)?)H)?(?:(\d+(?:[.,]\d+)?)M)?(?:(\d+(?:[.,]\d+)?)S)?)?$",
        )
        .ok()
    })
    .as_ref()
}

fn parse_clock(text: &str) -> Option<i64> {
    let captures = clock_duration()?.captures(text)?;
    let number = |index: usize| -> Option<i64> {
        captures.get(index).map_or(Some(0), |m| m.as_str().parse().ok())
    };

    let days = number(1)?;
    let negative = captures.get(2).is_some_and(|m| m.as_str() == "-");
    // a single leading group is minutes, two are hours then minutes
    let (hours, minutes) = match (captures.get(3), captures.get(4)) {
        (Some(_), Some(_)) => (number(3)?, number(4)?),
        (Some(_), None) => (0, number(3)?),
        _ => (0, 0),
    };
    let seconds = number(5)?;
    let micros = match captures.get(6) {
        Some(m) => format!("{:0<6}", m.as_str()).parse::<i64>().ok()?,
        None => 0,
    };

    let clock = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(MICROS_PER_SECOND)?
        .checked_add(micros)?;
    let clock = if negative { -clock } else { clock };
    days.checked_mul(MICROS_PER_DAY)?.checked_add(clock)
}

/// Whole microseconds in `seconds`, or `None` outside the representable range
fn seconds_to_micros(seconds: f64) -> Option<i64> {
    let micros = (seconds * MICROS_PER_SECOND as f64).round();
    // i64::MAX is not exactly representable; its nearest f64 is 2^63
    (micros.is_finite() && micros >= i64::MIN as f64 && micros < i64::MAX as f64).then_some(micros as i64)
}

fn parse_iso(text: &str) -> Option<i64> {
    let captures = iso_duration()?.captures(text)?;
    if (2..=5).all(|index| captures.get(index).is_none()) {
        return None;
    }
    let component = |index: usize, unit_seconds: f64| -> Option<f64> {
        match captures.get(index) {
            Some(m) => m.as_str().replace(',', ".").parse::<f64>().ok().map(|v| v * unit_seconds),
            None => Some(0.0),
        }
    };
    let seconds = component(2, 86_400.0)? + component(3, 3_600.0)? + component(4, 60.0)? + component(5, 1.0)?;
    let micros = seconds_to_micros(seconds)?;
    let negative = captures.get(1).is_some_and(|m| m.as_str() == "-");
    Some(if negative { -micros } else { micros })
}

/// Render microseconds as `[D day[s], ]HH:MM:SS[.ffffff]`
pub(crate) fn format_duration(total_micros: i64) -> String {
    let days = total_micros.div_euclid(MICROS_PER_DAY);
    let rest = total_micros.rem_euclid(MICROS_PER_DAY);
    let seconds = rest / MICROS_PER_SECOND;
    let micros = rest % MICROS_PER_SECOND;

    let mut rendered = format!("{:02}:{:02}:{:02}", seconds / 3_600, (seconds % 3_600) / 60, seconds % 60);
    if days != 0 {
        rendered = format!("{days} {rendered}");
    }
    if micros != 0 {
        rendered.push_str(&format!(".{micros:06}"));
    }
    rendered
}

pub(crate) fn to_duration(raw: &Value) -> Result<Value, String> {
    let invalid = || {
        "Duration has wrong format. Use one of these formats instead: [DD] [HH:[MM:]]ss[.uuuuuu].".to_string()
    };
    let micros = match raw {
        Value::Number(number) => {
            let seconds = number.as_f64().ok_or_else(invalid)?;
            seconds_to_micros(seconds).ok_or_else(invalid)?
        }
        Value::String(text) => {
            let text = text.trim();
            parse_clock(text).or_else(|| parse_iso(text)).ok_or_else(invalid)?
        }
        _ => return Err(invalid()),
    };
    Ok(Value::String(format_duration(micros)))
}
