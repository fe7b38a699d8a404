//! Helper utilities for reading catalog rows.
//!
//! Both drivers hand back rows as JSON objects, but PostgreSQL folds column
//! aliases to lower case and Oracle to upper case, and Oracle returns every
//! value as text. These helpers smooth that over for the metadata readers.

use crate::models::Row;
use crate::{Result, error::CompareError};
use serde_json::Value;

/// Extension trait for extracting typed values from result rows.
///
/// # Example
/// ```rust
/// use dbcompare_core::adapters::helpers::RowExt;
/// use dbcompare_core::models::Row;
///
/// let mut row = Row::new();
/// row.insert("COLUMN_NAME".to_string(), "ID".into());
/// row.insert("DATA_LENGTH".to_string(), "22".into());
///
/// assert_eq!(row.get_str("column_name").as_deref(), Some("ID"));
/// assert_eq!(row.get_i64("data_length"), Some(22));
/// ```
pub trait RowExt {
    /// Looks up a value by column name, ignoring case.
    fn get_value(&self, column: &str) -> Option<&Value>;

    /// Text value; numbers and booleans are rendered, NULL is `None`.
    fn get_str(&self, column: &str) -> Option<String> {
        match self.get_value(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Integer value; numeric text is parsed.
    fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get_value(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean flag; accepts JSON booleans and `YES`/`Y`/`TRUE`/`1` text.
    fn get_flag(&self, column: &str) -> bool {
        match self.get_value(column) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64() == Some(1),
            Some(Value::String(s)) => matches!(
                s.trim().to_ascii_uppercase().as_str(),
                "YES" | "Y" | "TRUE" | "T" | "1"
            ),
            _ => false,
        }
    }

    /// Required text value with table context in the error.
    fn require_str(&self, column: &str, table: &str) -> Result<String> {
        self.get_str(column)
            .ok_or_else(|| CompareError::decode(column, table))
    }
}

impl RowExt for Row {
    fn get_value(&self, column: &str) -> Option<&Value> {
        self.get(column).or_else(|| {
            self.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }
}

/// Interprets a `COUNT(*)` result value as a row count.
pub fn value_to_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let r = row(json!({"COLUMN_NAME": "EMAIL", "nullable": "Y"}));
        assert_eq!(r.get_str("column_name").as_deref(), Some("EMAIL"));
        assert!(r.get_flag("NULLABLE"));
        assert!(r.get_str("missing").is_none());
    }

    #[test]
    fn test_typed_accessors() {
        let r = row(json!({
            "len": "255",
            "precision": 10,
            "scale": null,
            "is_nullable": true,
            "flag": "NO",
        }));
        assert_eq!(r.get_i64("len"), Some(255));
        assert_eq!(r.get_i64("precision"), Some(10));
        assert_eq!(r.get_i64("scale"), None);
        assert!(r.get_flag("is_nullable"));
        assert!(!r.get_flag("flag"));
        assert_eq!(r.get_str("precision").as_deref(), Some("10"));
    }

    #[test]
    fn test_require_str_reports_table() {
        let r = row(json!({}));
        let err = r.require_str("column_name", "users").unwrap_err();
        assert!(err.to_string().contains("column_name"));
        assert!(err.to_string().contains("users"));
    }

    #[test]
    fn test_value_to_count() {
        assert_eq!(value_to_count(&json!(100)), Some(100));
        assert_eq!(value_to_count(&json!("45")), Some(45));
        assert_eq!(value_to_count(&json!(3.0)), Some(3));
        assert_eq!(value_to_count(&json!(-1)), None);
        assert_eq!(value_to_count(&json!(null)), None);
    }
}
