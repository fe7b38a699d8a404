//! Cross-database row normalization for content comparison.
//!
//! The same logical row comes back differently from the two drivers:
//! PostgreSQL reports lower-case column names and typed JSON values, Oracle
//! reports upper-case names and hands most values over as text. Rows are
//! reduced to a canonical form before they are compared.
//!
//! Key normalization rules:
//! - Column names: lower-cased, excluded columns dropped, keys ordered
//! - Booleans: `1` or `0`
//! - Numbers: integral values as integers; numeric text parsed only when it
//!   is already in canonical form, so `00501` or `12.00` stay text
//! - Strings: trailing blanks trimmed (CHAR padding), CRLF as LF; empty is NULL
//! - DateTimes: UTC, ISO 8601, truncated to milliseconds

use crate::models::Row;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

/// A row reduced to canonical form, ordered by column name.
pub type CanonicalRow = BTreeMap<String, Value>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^-?(0|[1-9]\d*)(\.\d+)?$").expect("Invalid numeric pattern"))
}

/// Lower-cased set of excluded column names.
pub fn exclusion_set(exclude_columns: &[String]) -> HashSet<String> {
    exclude_columns
        .iter()
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonicalizes a row, dropping columns in `excluded` (lower-cased names).
pub fn normalize_row(row: &Row, excluded: &HashSet<String>) -> CanonicalRow {
    row.iter()
        .map(|(column, value)| (column.to_ascii_lowercase(), value))
        .filter(|(column, _)| !excluded.contains(column))
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

/// Canonicalizes a single value.
pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::from(i64::from(*b)),
        Value::Number(n) => normalize_number(n),
        Value::String(s) => normalize_text(s),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), normalize_value(v)))
                .collect(),
        ),
    }
}

fn normalize_number(n: &Number) -> Value {
    if n.is_i64() || n.is_u64() {
        return Value::Number(n.clone());
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
        _ => Value::Number(n.clone()),
    }
}

fn normalize_text(text: &str) -> Value {
    let text = text.replace("\r\n", "\n");
    let trimmed = text.trim_end();

    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Some(number) = canonical_number(trimmed) {
        return number;
    }

    if let Some(timestamp) = normalize_timestamp(trimmed) {
        return Value::String(timestamp);
    }

    Value::String(trimmed.to_string())
}

/// Parses text that prints back unchanged as a number.
///
/// Identifiers such as zip codes and phone numbers keep their leading zeros.
fn canonical_number(text: &str) -> Option<Value> {
    if !numeric_pattern().is_match(text) {
        return None;
    }

    if !text.contains('.') {
        return text
            .parse::<i64>()
            .ok()
            .filter(|i| i.to_string() == text)
            .map(Value::from);
    }

    text.parse::<f64>()
        .ok()
        .filter(|f| f.to_string() == text)
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn normalize_timestamp(text: &str) -> Option<String> {
    // Cheap reject before trying the chrono parsers
    if text.len() < 10 || !text.as_bytes()[0].is_ascii_digit() || text.as_bytes().get(4) != Some(&b'-') {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).format(TIMESTAMP_FORMAT).to_string());
    }

    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.format(TIMESTAMP_FORMAT).to_string());
        }
    }

    // TODO: pass column types in so an Oracle DATE at midnight matches a
    // PostgreSQL `date` instead of rendering with a time part.
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    None
}

/// Renders the key columns of a canonical row as `col=value, ...`.
pub fn record_key(row: &CanonicalRow, key_columns: &[String]) -> String {
    key_columns
        .iter()
        .map(|column| {
            let value = row.get(column).unwrap_or(&Value::Null);
            match value {
                Value::String(s) => format!("{}={}", column, s),
                other => format!("{}={}", column, other),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
