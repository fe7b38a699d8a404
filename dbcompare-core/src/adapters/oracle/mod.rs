//! Oracle connection over the synchronous `oracle` driver.
//!
//! # Module Structure
//! - `connection`: Blocking driver calls moved onto the tokio blocking pool
//! - `metadata`: `ALL_TAB_COLUMNS` / `ALL_CONSTRAINTS` / `ALL_INDEXES` reads
//!
//! Requires Oracle Instant Client on the library path at runtime.

mod connection;
mod metadata;

use super::DatabaseConnection;
use crate::config::DatabaseConfig;
use crate::models::{DatabaseType, QueryParam, Row, TableMetadata};
use crate::{Result, error::CompareError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub use metadata::group_index_rows;

/// Oracle side of a comparison
pub struct OracleConnection {
    config: DatabaseConfig,
    conn: Option<Arc<Mutex<oracle::Connection>>>,
}

impl std::fmt::Debug for OracleConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConnection")
            .field("target", &self.config.safe_description())
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl OracleConnection {
    /// Creates an unconnected Oracle connection.
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, conn: None }
    }

    /// Owner whose tables unqualified names resolve to.
    ///
    /// Falls back to the login user, which is Oracle's own default schema.
    pub(crate) fn owner(&self) -> String {
        self.config
            .schema
            .as_deref()
            .unwrap_or(&self.config.username)
            .to_ascii_uppercase()
    }
}

#[async_trait]
impl DatabaseConnection for OracleConnection {
    async fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        tracing::info!("Connecting to {}", self.config.safe_description());
        let conn = connection::open(&self.config).await?;
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            connection::close(conn).await?;
            tracing::debug!("Closed connection to {}", self.config.safe_description());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn execute_query(&self, query: &str, params: &[QueryParam]) -> Result<Vec<Row>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| CompareError::query_failed("Oracle connection is not open"))?;
        connection::query_json_rows(Arc::clone(conn), query, params).await
    }

    async fn get_metadata(&self, table: &str) -> Result<TableMetadata> {
        metadata::collect_table_metadata(self, table).await
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Oracle
    }

    fn schema(&self) -> Option<&str> {
        self.config.schema.as_deref()
    }

    fn safe_description(&self) -> String {
        self.config.safe_description()
    }
}
