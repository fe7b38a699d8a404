//! PostgreSQL connection backed by a single-connection sqlx pool.
//!
//! # Module Structure
//! - `connection`: Pool creation, session settings and JSON row queries
//! - `metadata`: Column, primary key and index catalog reads
//!
//! # Security Guarantees
//! - Sessions are opened with `default_transaction_read_only = on`
//! - Connection targets are described without credentials in errors
//! - The acquire timeout comes from `DatabaseConfig::connect_timeout_secs`

mod connection;
mod metadata;

use super::DatabaseConnection;
use crate::config::DatabaseConfig;
use crate::models::{DatabaseType, QueryParam, Row, TableMetadata};
use crate::Result;
use async_trait::async_trait;
use sqlx::PgPool;

pub use metadata::{column_from_row, index_from_row};

/// PostgreSQL side of a comparison
pub struct PostgresConnection {
    config: DatabaseConfig,
    pool: Option<PgPool>,
}

impl std::fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("target", &self.config.safe_description())
            .field("connected", &self.pool.is_some())
            .finish()
    }
}

impl PostgresConnection {
    /// Creates an unconnected PostgreSQL connection.
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, pool: None }
    }

    /// Schema used for catalog lookups of unqualified tables.
    pub(crate) fn catalog_schema(&self) -> &str {
        self.config.schema.as_deref().unwrap_or("public")
    }
}

#[async_trait]
impl DatabaseConnection for PostgresConnection {
    async fn connect(&mut self) -> Result<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        tracing::info!("Connecting to {}", self.config.safe_description());
        let pool = connection::create_pool(&self.config).await?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::debug!("Closed connection to {}", self.config.safe_description());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.as_ref().is_some_and(|p| !p.is_closed())
    }

    async fn execute_query(&self, query: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            crate::error::CompareError::query_failed("PostgreSQL connection is not open")
        })?;
        connection::query_json_rows(pool, query, params).await
    }

    async fn get_metadata(&self, table: &str) -> Result<TableMetadata> {
        metadata::collect_table_metadata(self, table).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn schema(&self) -> Option<&str> {
        self.config.schema.as_deref()
    }

    fn safe_description(&self) -> String {
        self.config.safe_description()
    }
}
