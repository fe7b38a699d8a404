//! Blocking Oracle driver calls bridged onto tokio.

use crate::config::DatabaseConfig;
use crate::error::CompareError;
use crate::models::{QueryParam, Row};
use crate::Result;
use oracle::sql_type::{OracleType, ToSql};
use serde_json::Value;
use std::sync::{Arc, Mutex};

fn join_error(e: tokio::task::JoinError) -> CompareError {
    CompareError::query_failed(format!("Oracle worker task failed: {}", e))
}

/// Connects with EZConnect (`host:port/service`), bounded by the configured timeout.
pub(super) async fn open(config: &DatabaseConfig) -> Result<oracle::Connection> {
    let username = config.username.clone();
    let password = config.password.clone();
    let connect_string = config.connect_string();
    let description = config.safe_description();

    let task = tokio::task::spawn_blocking(move || {
        oracle::Connection::connect(&username, password.expose(), &connect_string)
    });

    match tokio::time::timeout(config.connect_timeout(), task).await {
        Ok(joined) => joined
            .map_err(join_error)?
            .map_err(|e| CompareError::connection_failed(description, e)),
        Err(elapsed) => Err(CompareError::connection_failed(
            format!("{} (timed out after {}s)", description, config.connect_timeout_secs),
            elapsed,
        )),
    }
}

/// Closes the session on the blocking pool.
pub(super) async fn close(conn: Arc<Mutex<oracle::Connection>>) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| CompareError::query_failed("Oracle connection lock poisoned"))?;
        guard
            .close()
            .map_err(|e| CompareError::query_failed(e.to_string()))
    })
    .await
    .map_err(join_error)?
}

fn to_sql(param: &QueryParam) -> Box<dyn ToSql> {
    match param {
        QueryParam::Null => Box::new(None::<String>),
        QueryParam::Bool(b) => Box::new(i64::from(*b)),
        QueryParam::Integer(i) => Box::new(*i),
        QueryParam::Float(f) => Box::new(*f),
        QueryParam::Text(s) => Box::new(s.clone()),
    }
}

/// Runs `query` and returns each row as a JSON object keyed by column name.
pub(super) async fn query_json_rows(
    conn: Arc<Mutex<oracle::Connection>>,
    query: &str,
    params: &[QueryParam],
) -> Result<Vec<Row>> {
    let sql = query.trim().trim_end_matches(';').to_string();
    let params = params.to_vec();

    tracing::trace!("Oracle query: {}", sql);

    tokio::task::spawn_blocking(move || {
        let guard = conn
            .lock()
            .map_err(|_| CompareError::query_failed("Oracle connection lock poisoned"))?;

        let bound: Vec<Box<dyn ToSql>> = params.iter().map(to_sql).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|b| b.as_ref()).collect();

        let rows = guard
            .query(&sql, &refs)
            .map_err(|e| CompareError::query_failed(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let row = row_result.map_err(|e| CompareError::query_failed(e.to_string()))?;
            records.push(row_to_json(&row)?);
        }
        Ok(records)
    })
    .await
    .map_err(join_error)?
}

fn row_to_json(row: &oracle::Row) -> Result<Row> {
    let mut map = Row::new();
    for (idx, info) in row.column_info().iter().enumerate() {
        let text: Option<String> = row
            .get(idx)
            .map_err(|_| CompareError::decode(info.name(), "query result"))?;
        map.insert(info.name().to_string(), oracle_value(info.oracle_type(), text));
    }
    Ok(map)
}

/// Maps a textual Oracle value onto JSON, keeping numbers numeric.
fn oracle_value(oracle_type: &OracleType, text: Option<String>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };

    match oracle_type {
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble
        | OracleType::Int64
        | OracleType::UInt64 => numeric_value(&text),
        _ => Value::String(text),
    }
}

fn numeric_value(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_value_numbers() {
        assert_eq!(
            oracle_value(&OracleType::Number(10, 0), Some("42".to_string())),
            Value::from(42)
        );
        assert_eq!(
            oracle_value(&OracleType::Number(12, 2), Some("1234.5".to_string())),
            Value::from(1234.5)
        );
        assert_eq!(oracle_value(&OracleType::Number(0, 0), None), Value::Null);
    }

    #[test]
    fn test_oracle_value_text() {
        assert_eq!(
            oracle_value(&OracleType::Varchar2(50), Some("alice".to_string())),
            Value::String("alice".to_string())
        );
    }

    #[test]
    fn test_numeric_value_keeps_unparseable_text() {
        assert_eq!(numeric_value("~"), Value::String("~".to_string()));
    }
}
