//! In-memory connection backed by registered tables.
//!
//! Used by the test suite and for dry runs of a configuration without a live
//! database. Behaves like a real connection: every operation fails while it
//! is not connected, and unknown tables fail the same way a catalog miss does.

use super::DatabaseConnection;
use crate::models::{DatabaseType, QueryParam, Row, TableMetadata};
use crate::{Result, error::CompareError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Call counters shared with the test that built the connection.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    metadata_requests: AtomicUsize,
    queries: AtomicUsize,
}

impl ConnectionStats {
    /// Successful `connect` calls.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// `disconnect` calls that closed an open connection.
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// `get_metadata` calls, including failed ones.
    pub fn metadata_requests(&self) -> usize {
        self.metadata_requests.load(Ordering::SeqCst)
    }

    /// Row reads: counts, samples and ad-hoc queries.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    metadata: Option<TableMetadata>,
    rows: Vec<Row>,
    row_count: Option<u64>,
}

/// Connection serving registered tables from memory.
///
/// # Example
/// ```rust
/// use dbcompare_core::adapters::{DatabaseConnection, MemoryConnection};
/// use dbcompare_core::models::DatabaseType;
///
/// let conn = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 100);
/// assert!(!conn.is_connected());
/// ```
#[derive(Debug)]
pub struct MemoryConnection {
    database_type: DatabaseType,
    name: String,
    tables: HashMap<String, MemoryTable>,
    canned_queries: HashMap<String, Vec<Row>>,
    failing_tables: HashSet<String>,
    fail_connect: bool,
    connected: bool,
    stats: Arc<ConnectionStats>,
}

fn key(table: &str) -> String {
    table.to_ascii_lowercase()
}

fn into_rows(values: Vec<Value>) -> Vec<Row> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

impl MemoryConnection {
    /// Creates an empty, unconnected connection.
    pub fn new(database_type: DatabaseType) -> Self {
        Self {
            database_type,
            name: "memory".to_string(),
            tables: HashMap::new(),
            canned_queries: HashMap::new(),
            failing_tables: HashSet::new(),
            fail_connect: false,
            connected: false,
            stats: Arc::new(ConnectionStats::default()),
        }
    }

    /// Builder method to name the connection in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a table with catalog metadata and rows.
    ///
    /// Non-object values in `rows` are ignored.
    pub fn with_table(mut self, metadata: TableMetadata, rows: Vec<Value>) -> Self {
        let entry = self.tables.entry(key(&metadata.name)).or_default();
        entry.rows = into_rows(rows);
        entry.metadata = Some(metadata);
        self
    }

    /// Registers rows for a table without catalog metadata.
    pub fn with_rows(mut self, table: &str, rows: Vec<Value>) -> Self {
        self.tables.entry(key(table)).or_default().rows = into_rows(rows);
        self
    }

    /// Overrides the row count reported for a table.
    ///
    /// Lets a test report large counts without materializing the rows.
    pub fn with_row_count(mut self, table: &str, count: u64) -> Self {
        self.tables.entry(key(table)).or_default().row_count = Some(count);
        self
    }

    /// Makes every operation touching `table` fail with a query error.
    pub fn with_query_failure(mut self, table: &str) -> Self {
        self.failing_tables.insert(key(table));
        self
    }

    /// Makes `connect` fail.
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Registers the rows returned by `execute_query` for an exact SQL text.
    pub fn with_query_result(mut self, sql: &str, rows: Vec<Value>) -> Self {
        self.canned_queries
            .insert(sql.trim().to_string(), into_rows(rows));
        self
    }

    /// Shared call counters.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(CompareError::query_failed(format!(
                "{} connection is not open",
                self.name
            )))
        }
    }

    fn table(&self, table: &str) -> Result<&MemoryTable> {
        self.ensure_connected()?;
        let k = key(table);
        if self.failing_tables.contains(&k) {
            return Err(CompareError::query_failed(format!(
                "simulated failure reading {}",
                table
            )));
        }
        self.tables.get(&k).ok_or_else(|| {
            CompareError::query_failed(format!("relation \"{}\" does not exist", table))
        })
    }
}

#[async_trait]
impl DatabaseConnection for MemoryConnection {
    async fn connect(&mut self) -> Result<()> {
        if self.connected {
            return Ok(());
        }
        if self.fail_connect {
            return Err(CompareError::connection_failed(
                self.safe_description(),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        self.connected = true;
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Connected to {}", self.safe_description());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.connected {
            self.connected = false;
            self.stats.disconnects.fetch_add(1, Ordering::SeqCst);
            tracing::debug!("Disconnected from {}", self.safe_description());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn execute_query(&self, query: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
        self.ensure_connected()?;
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        self.canned_queries
            .get(query.trim())
            .cloned()
            .ok_or_else(|| CompareError::query_failed(format!("no result registered for: {}", query)))
    }

    async fn get_metadata(&self, table: &str) -> Result<TableMetadata> {
        self.stats.metadata_requests.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected()?;
        if self.failing_tables.contains(&key(table)) {
            return Err(CompareError::query_failed(format!(
                "simulated failure reading {}",
                table
            )));
        }
        self.tables
            .get(&key(table))
            .and_then(|t| t.metadata.clone())
            .ok_or_else(|| CompareError::missing_metadata(table))
    }

    fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    fn safe_description(&self) -> String {
        format!("{} ({})", self.name, self.database_type)
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        let entry = self.table(table)?;
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        Ok(entry.row_count.unwrap_or(entry.rows.len() as u64))
    }

    /// Rows come back in registration order; `order_by` is ignored.
    async fn fetch_sample(&self, table: &str, _order_by: &[String], limit: usize) -> Result<Vec<Row>> {
        let entry = self.table(table)?;
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        Ok(entry.rows.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnMetadata;
    use serde_json::json;

    fn projects() -> TableMetadata {
        TableMetadata::new("projects")
            .with_column(ColumnMetadata::new("id", "integer"))
            .with_primary_key(["id"])
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let conn = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 5);
        assert!(conn.count_rows("users").await.is_err());
        assert!(conn.get_metadata("users").await.is_err());
        assert!(conn.execute_query("SELECT 1", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_row_count_override_and_sample_limit() {
        let mut conn = MemoryConnection::new(DatabaseType::Oracle)
            .with_table(projects(), vec![json!({"ID": 1}), json!({"ID": 2}), json!({"ID": 3})])
            .with_row_count("PROJECTS", 50);
        conn.connect().await.unwrap();

        assert_eq!(conn.count_rows("projects").await.unwrap(), 50);
        assert_eq!(conn.fetch_sample("Projects", &[], 2).await.unwrap().len(), 2);
        assert_eq!(conn.stats().queries(), 2);
    }

    #[tokio::test]
    async fn test_missing_metadata() {
        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL).with_rows("logs", vec![]);
        conn.connect().await.unwrap();

        let err = conn.get_metadata("logs").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing table metadata: logs");

        let err = conn.get_metadata("ghost").await.unwrap_err();
        assert!(matches!(err, CompareError::MissingMetadata { .. }));
        assert_eq!(conn.stats().metadata_requests(), 2);
    }

    #[tokio::test]
    async fn test_unknown_table_count_fails() {
        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL);
        conn.connect().await.unwrap();
        let err = conn.count_rows("ghost").await.unwrap_err();
        assert!(err.to_string().starts_with("Query execution failed"));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL)
            .with_table(projects(), vec![])
            .with_query_failure("projects");
        conn.connect().await.unwrap();
        assert!(conn.count_rows("projects").await.is_err());
        assert!(conn.get_metadata("projects").await.is_err());

        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL).with_connect_failure();
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, CompareError::Connection { .. }));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_connect_disconnect_are_idempotent() {
        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL);
        let stats = conn.stats();
        conn.connect().await.unwrap();
        conn.connect().await.unwrap();
        conn.disconnect().await.unwrap();
        conn.disconnect().await.unwrap();
        assert_eq!(stats.connects(), 1);
        assert_eq!(stats.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_canned_query() {
        let mut conn = MemoryConnection::new(DatabaseType::PostgreSQL)
            .with_query_result("SELECT 1 AS one", vec![json!({"one": 1})]);
        conn.connect().await.unwrap();
        let rows = conn.execute_query(" SELECT 1 AS one ", &[]).await.unwrap();
        assert_eq!(rows[0]["one"], json!(1));
        assert!(conn.execute_query("SELECT 2", &[]).await.is_err());
    }
}
