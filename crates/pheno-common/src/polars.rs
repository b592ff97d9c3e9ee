//! Polars AnyValue utility functions.
//!
//! Helpers for turning `AnyValue` cells into output text and numbers.

use polars::prelude::AnyValue;

use crate::missing::MISSING_MARKER;

/// Converts a Polars `AnyValue` to a `String` representation.
///
/// Returns an empty string for `Null` and formats floats without trailing
/// zeros. Booleans use the `True`/`False` spelling of the QC exports.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use pheno_common::any_to_string;
///
/// assert_eq!(any_to_string(AnyValue::Null), "");
/// assert_eq!(any_to_string(AnyValue::Int64(42)), "42");
/// assert_eq!(any_to_string(AnyValue::Float64(71.5)), "71.5");
/// assert_eq!(any_to_string(AnyValue::Boolean(true)), "True");
/// ```
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => if b { "True" } else { "False" }.to_string(),
        other => other.to_string(),
    }
}

/// Converts an `AnyValue` to output text, writing [`MISSING_MARKER`] for nulls.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use pheno_common::any_to_output;
///
/// assert_eq!(any_to_output(AnyValue::Null), "n/a");
/// assert_eq!(any_to_output(AnyValue::String("CON")), "CON");
/// ```
pub fn any_to_output(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => MISSING_MARKER.to_string(),
        other => any_to_string(other),
    }
}

/// Formats a floating-point number as a string without trailing zeros.
///
/// # Examples
///
/// ```
/// use pheno_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(70.25), "70.25");
/// assert_eq!(format_numeric(0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rounds to a fixed number of decimal places.
///
/// # Examples
///
/// ```
/// use pheno_common::round_to;
///
/// assert_eq!(round_to(74.0 / 12.0, 2), 6.17);
/// assert_eq!(round_to(2.5, 0), 3.0);
/// ```
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Parses a string as `f64`, returning `None` for invalid, empty or non-finite strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a string as `i64`.
///
/// Accepts integral decimals such as `"2.0"`, which is how dataframe tools write
/// integer columns that contained missing values.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(parsed);
    }
    trimmed.parse::<f64>().ok().and_then(integral)
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}
