//! Field coercers: total conversions from raw text to canonical values.
//!
//! Every coercer takes `Option<&str>` (absent or present raw text). Coercers with a safe
//! fallback return [`Coerced`], which records whether the value was parsed or defaulted so the
//! cleaner can count defaults. The coercers without a safe fallback (price and flags) return
//! `Result` and let the cleaner reject the record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoerceError;
use crate::literal;

static CURRENCY_DECORATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{Sc},\s]").expect("currency pattern is valid"));

static EMBEDDED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+\.?[0-9]*").expect("embedded number pattern is valid"));

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// The outcome of a coercer that always produces a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    /// The raw text was present and well-formed.
    Parsed(T),
    /// The raw text was missing or malformed; the field default was substituted.
    Defaulted(T),
}

impl<T> Coerced<T> {
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Coerced::Defaulted(_))
    }

    pub fn into_value(self) -> T {
        match self {
            Coerced::Parsed(v) | Coerced::Defaulted(v) => v,
        }
    }
}

/// Treats whitespace-only text the same as a missing value.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// `"$1,234.56"` → `1234.56`. A missing, malformed or negative price rejects the record.
pub fn currency(raw: Option<&str>) -> Result<f64, CoerceError> {
    let raw = present(raw).ok_or(CoerceError::MissingPrice)?;
    let stripped = CURRENCY_DECORATION.replace_all(raw, "");
    let value = stripped
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CoerceError::InvalidPrice(raw.to_owned()))?;
    if value < 0.0 {
        return Err(CoerceError::NegativePrice(value));
    }
    Ok(value)
}

/// `"t"` → `true`, `"f"` → `false`. A missing flag defaults to `false`; any other token
/// rejects the record.
pub fn flag(raw: Option<&str>) -> Result<Coerced<bool>, CoerceError> {
    match present(raw) {
        None => Ok(Coerced::Defaulted(false)),
        Some("t") => Ok(Coerced::Parsed(true)),
        Some("f") => Ok(Coerced::Parsed(false)),
        Some(other) => Err(CoerceError::UnknownFlag {
            token: other.to_owned(),
        }),
    }
}

/// Parses RFC 3339 timestamps, naive date-times and plain dates (naive values are taken as UTC).
/// Anything else is `None`.
pub fn date(raw: Option<&str>) -> Coerced<Option<DateTime<Utc>>> {
    let Some(raw) = present(raw) else {
        return Coerced::Defaulted(None);
    };
    match parse_timestamp(raw) {
        Some(ts) => Coerced::Parsed(Some(ts)),
        None => {
            tracing::debug!(raw, "Unparseable date, treating as unknown");
            Coerced::Defaulted(None)
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parses a non-negative finite number, substituting `default` otherwise.
pub fn number_or(raw: Option<&str>, default: f64) -> Coerced<f64> {
    match present(raw).and_then(parse_non_negative) {
        Some(v) => Coerced::Parsed(v),
        None => Coerced::Defaulted(default),
    }
}

/// Parses a finite number no smaller than `minimum`, which is also the fallback.
pub fn number_at_least(raw: Option<&str>, minimum: f64) -> Coerced<f64> {
    match present(raw).and_then(parse_non_negative).filter(|v| *v >= minimum) {
        Some(v) => Coerced::Parsed(v),
        None => Coerced::Defaulted(minimum),
    }
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Parses a finite number; missing or malformed text is `None`.
pub fn optional_number(raw: Option<&str>) -> Coerced<Option<f64>> {
    let Some(raw) = present(raw) else {
        return Coerced::Defaulted(None);
    };
    match raw.parse::<f64>().ok().filter(|v| v.is_finite()) {
        Some(v) => Coerced::Parsed(Some(v)),
        None => Coerced::Defaulted(None),
    }
}

/// Parses a whole number, accepting float spellings such as `"3.0"` that exports often carry.
pub fn optional_integer(raw: Option<&str>) -> Coerced<Option<i64>> {
    let Some(raw) = present(raw) else {
        return Coerced::Defaulted(None);
    };
    match parse_integer(raw) {
        Some(v) => Coerced::Parsed(Some(v)),
        None => Coerced::Defaulted(None),
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15)
        .map(|v| v as i64)
}

/// Passes text through, substituting the empty string when missing.
pub fn text_or_empty(raw: Option<&str>) -> Coerced<String> {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(s) => Coerced::Parsed(s.to_owned()),
        None => Coerced::Defaulted(String::new()),
    }
}

/// Passes text through; missing stays missing.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| !s.trim().is_empty()).map(str::to_owned)
}

/// Finds the first decimal-looking substring in free text: `"1.5 baths"` → `Some(1.5)`.
pub fn extract_number(raw: Option<&str>) -> Option<f64> {
    let raw = raw?;
    EMBEDDED_NUMBER
        .find(raw)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Bathroom count from free text such as `"1.5 shared baths"`; `0` when no digit is present.
pub fn bathrooms(raw: Option<&str>) -> Coerced<f64> {
    match extract_number(raw) {
        Some(v) => Coerced::Parsed(v),
        None => Coerced::Defaulted(0.0),
    }
}

/// Parses a stringified list into strings; missing or malformed input is an empty list.
pub fn string_list(raw: Option<&str>) -> Coerced<Vec<String>> {
    let Some(raw) = present(raw) else {
        return Coerced::Defaulted(Vec::new());
    };
    match literal::parse_literal(raw) {
        Ok(literal::Literal::List(items)) => Coerced::Parsed(literal::into_strings(items)),
        _ => Coerced::Defaulted(Vec::new()),
    }
}
