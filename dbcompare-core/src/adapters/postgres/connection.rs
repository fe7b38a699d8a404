//! PostgreSQL pool management and JSON row queries.

use crate::config::DatabaseConfig;
use crate::error::CompareError;
use crate::models::{QueryParam, Row};
use crate::Result;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

/// Opens a pool holding exactly one connection.
///
/// Every new session is switched to read-only and UTC before use, and the
/// first connection is established eagerly so an unreachable server fails here.
pub(crate) async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    use sqlx::Executor;

    let url = config.connection_url()?;
    tracing::debug!("Opening PostgreSQL pool for {}", config.redacted_url());

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(1)
        .min_connections(0)
        .acquire_timeout(config.connect_timeout())
        .test_before_acquire(true)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET default_transaction_read_only = on").await?;
                conn.execute("SET timezone = 'UTC'").await?;
                let app_name = format!("dbcompare-{}", env!("CARGO_PKG_VERSION"));
                conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                    .await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .map_err(|e| CompareError::connection_failed(config.safe_description(), e))
}

/// Runs `query` and returns each row as a JSON object.
///
/// The query is wrapped in `row_to_json` so every column type, including
/// numerics and timestamps, arrives in one uniform shape.
pub(crate) async fn query_json_rows(
    pool: &PgPool,
    query: &str,
    params: &[QueryParam],
) -> Result<Vec<Row>> {
    let wrapped = format!(
        "SELECT row_to_json(q.*) AS row_data FROM ({}) q",
        query.trim().trim_end_matches(';')
    );

    let mut statement = sqlx::query_scalar::<_, JsonValue>(&wrapped);
    for param in params {
        statement = match param {
            QueryParam::Null => statement.bind(None::<String>),
            QueryParam::Bool(b) => statement.bind(*b),
            QueryParam::Integer(i) => statement.bind(*i),
            QueryParam::Float(f) => statement.bind(*f),
            QueryParam::Text(s) => statement.bind(s.as_str()),
        };
    }

    tracing::trace!("PostgreSQL query: {}", query);

    let values = statement
        .fetch_all(pool)
        .await
        .map_err(|e| CompareError::query_failed(e.to_string()))?;

    values
        .into_iter()
        .map(|value| match value {
            JsonValue::Object(map) => Ok(map),
            _ => Err(CompareError::decode("row_data", "query result")),
        })
        .collect()
}
