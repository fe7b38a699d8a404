//! Database connection trait and factory for uniform access to both sides.
//!
//! This module defines the capability interface every backend implements so
//! the comparators can run against PostgreSQL, Oracle or an in-memory stand-in
//! without ever branching on the database kind.
//!
//! # Module Structure
//! - `dialect`: Identifier quoting, placeholders and query construction
//! - `helpers`: Shared row helpers for catalog readers
//! - `memory`: In-memory connection for tests and dry runs
//! - Database-specific modules (postgres, oracle)

use crate::models::{DatabaseType, QueryParam, Row, TableMetadata};
use crate::{Result, config::DatabaseConfig, error::CompareError};
use async_trait::async_trait;

pub mod dialect;
pub mod helpers;
pub mod memory;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "oracle")]
pub mod oracle;

pub use dialect::SqlDialect;
pub use memory::{ConnectionStats, MemoryConnection};

/// Uniform interface over one database side.
///
/// # Security Guarantees
/// - Only `SELECT` statements and catalog reads are issued
/// - Credentials are never logged; use [`safe_description`](Self::safe_description)
/// - Each implementation holds at most one driver connection
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn DatabaseConnection>`.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Opens the driver connection. Calling it on an open connection is a no-op.
    ///
    /// # Errors
    /// Returns a connection error (credentials sanitized) if the server is unreachable
    async fn connect(&mut self) -> Result<()>;

    /// Closes the driver connection. Calling it on a closed connection is a no-op.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether [`connect`](Self::connect) succeeded and no disconnect followed.
    fn is_connected(&self) -> bool;

    /// Runs a query and returns each row as a JSON object keyed by column name.
    ///
    /// Parameters are bound through the dialect's placeholder syntax
    /// (`$1` for PostgreSQL, `:1` for Oracle).
    ///
    /// # Errors
    /// Returns `Query execution failed: <cause>` when the driver rejects the query
    async fn execute_query(&self, query: &str, params: &[QueryParam]) -> Result<Vec<Row>>;

    /// Reads the catalog entry for a table.
    ///
    /// # Errors
    /// Returns `Missing table metadata: <table>` when the table does not exist
    async fn get_metadata(&self, table: &str) -> Result<TableMetadata>;

    /// Backend kind of this connection.
    fn database_type(&self) -> DatabaseType;

    /// SQL dialect used for generated statements.
    fn dialect(&self) -> SqlDialect {
        SqlDialect::for_database(self.database_type())
    }

    /// Schema that unqualified table names resolve against.
    fn schema(&self) -> Option<&str> {
        None
    }

    /// Credential-free description for logs.
    fn safe_description(&self) -> String;

    /// Counts rows with `SELECT COUNT(*)`.
    async fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = self.dialect().count_query(self.schema(), table)?;
        let rows = self.execute_query(&sql, &[]).await?;

        rows.first()
            .and_then(|row| row.values().next())
            .and_then(helpers::value_to_count)
            .ok_or_else(|| CompareError::decode("row_count", table))
    }

    /// Fetches the first `limit` rows, ordered by `order_by` when non-empty.
    async fn fetch_sample(&self, table: &str, order_by: &[String], limit: usize) -> Result<Vec<Row>> {
        let sql = self.dialect().sample_query(self.schema(), table, order_by)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute_query(&sql, &[QueryParam::Integer(limit)]).await
    }
}

/// Factory function creating an unconnected database connection.
///
/// # Returns
/// Boxed connection for dynamic dispatch; call `connect()` before use.
///
/// # Errors
/// Returns error if:
/// - The configuration is invalid
/// - The required driver feature is not compiled in
pub fn create_connection(config: &DatabaseConfig) -> Result<Box<dyn DatabaseConnection>> {
    config.validate()?;

    match config.database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => Ok(Box::new(postgres::PostgresConnection::new(
            config.clone(),
        ))),
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(CompareError::unsupported_feature(
            "PostgreSQL connection",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
        #[cfg(feature = "oracle")]
        DatabaseType::Oracle => Ok(Box::new(oracle::OracleConnection::new(config.clone()))),
        #[cfg(not(feature = "oracle"))]
        DatabaseType::Oracle => Err(CompareError::unsupported_feature(
            "Oracle connection",
            "Compile with --features oracle to enable Oracle support",
        )),
    }
}
