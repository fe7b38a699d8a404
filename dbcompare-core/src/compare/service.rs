//! Comparison orchestrator.
//!
//! [`ComparisonService`] owns both connections and the metadata cache for
//! the duration of its life, runs the comparators one table at a time, and
//! always leaves both sides disconnected when a run ends.

use super::content::{ContentOptions, compare_content};
use super::count::compare_counts;
use super::models::{
    ComparisonError, ComparisonReport, ComparisonScope, ContentComparisonResult,
    CountComparisonResult, StructureComparisonResult,
};
use super::structure::compare_structure;
use super::summary::build_summary;
use crate::adapters::{DatabaseConnection, create_connection};
use crate::cache::{MetadataCache, TtlMetadataCache};
use crate::config::ComparisonConfig;
use crate::error::CompareError;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

const FULL_OPERATION: &str = "full_comparison";
const PARTIAL_OPERATION: &str = "partial_comparison";

/// Per-table failure handling for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnTableError {
    Abort,
    Record,
}

impl OnTableError {
    fn from_config(config: &ComparisonConfig) -> Self {
        if config.continue_on_error {
            OnTableError::Record
        } else {
            OnTableError::Abort
        }
    }
}

/// Runs count, content and structure comparisons between two connections.
///
/// # Example
///
/// ```rust
/// use dbcompare_core::adapters::MemoryConnection;
/// use dbcompare_core::compare::ComparisonService;
/// use dbcompare_core::config::ComparisonConfig;
/// use dbcompare_core::models::DatabaseType;
///
/// # #[tokio::main]
/// # async fn main() -> dbcompare_core::Result<()> {
/// let source = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 3);
/// let target = MemoryConnection::new(DatabaseType::Oracle).with_row_count("users", 3);
///
/// let mut service = ComparisonService::new(Box::new(source), Box::new(target));
/// let config = ComparisonConfig::skeleton().with_tables(["users"]);
/// let counts = service.perform_comparison(
///     &config,
///     dbcompare_core::compare::ComparisonScope::count_only(),
/// ).await?;
///
/// assert_eq!(counts.exit_code(), 0);
/// # Ok(())
/// # }
/// ```
pub struct ComparisonService {
    source: Box<dyn DatabaseConnection>,
    target: Box<dyn DatabaseConnection>,
    cache: Arc<dyn MetadataCache>,
    content_options: ContentOptions,
    errors: Vec<ComparisonError>,
}

impl std::fmt::Debug for ComparisonService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonService")
            .field("source", &self.source.safe_description())
            .field("target", &self.target.safe_description())
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl ComparisonService {
    /// Creates a service over two connections with a default TTL metadata cache.
    pub fn new(source: Box<dyn DatabaseConnection>, target: Box<dyn DatabaseConnection>) -> Self {
        Self {
            source,
            target,
            cache: Arc::new(TtlMetadataCache::default()),
            content_options: ContentOptions::default(),
            errors: Vec::new(),
        }
    }

    /// Creates a service with connections built from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if either side fails validation or its backend is
    /// not compiled in.
    pub fn from_config(config: &ComparisonConfig) -> Result<Self> {
        let source = create_connection(&config.source_db)?;
        let target = create_connection(&config.target_db)?;
        Ok(Self::new(source, target).with_content_options(ContentOptions::from_config(config)))
    }

    /// Builder method to replace the metadata cache.
    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Builder method to set the options used by [`compare_table_content`](Self::compare_table_content).
    pub fn with_content_options(mut self, options: ContentOptions) -> Self {
        self.content_options = options;
        self
    }

    /// Source connection.
    pub fn source(&self) -> &dyn DatabaseConnection {
        self.source.as_ref()
    }

    /// Target connection.
    pub fn target(&self) -> &dyn DatabaseConnection {
        self.target.as_ref()
    }

    /// Errors recorded by every run so far.
    pub fn errors(&self) -> &[ComparisonError] {
        &self.errors
    }

    /// Forgets recorded errors.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Compares row counts, stopping at the first failing table.
    pub async fn compare_table_counts(&self, tables: &[String]) -> Result<Vec<CountComparisonResult>> {
        self.count_phase(tables, OnTableError::Abort, &mut Vec::new())
            .await
    }

    /// Compares up to `sample_size` rows per table, stopping at the first failing table.
    pub async fn compare_table_content(
        &self,
        tables: &[String],
        sample_size: usize,
    ) -> Result<Vec<ContentComparisonResult>> {
        let options = self.content_options.clone().with_sample_size(sample_size);
        self.content_phase(tables, &options, OnTableError::Abort, &mut Vec::new())
            .await
    }

    /// Compares table structure, stopping at the first failing table.
    pub async fn compare_table_structure(
        &self,
        tables: &[String],
    ) -> Result<Vec<StructureComparisonResult>> {
        self.structure_phase(tables, OnTableError::Abort, &mut Vec::new())
            .await
    }

    /// Runs count, content and structure comparison for every configured table.
    ///
    /// Both connections are opened if needed and closed when the run ends.
    ///
    /// # Errors
    ///
    /// Returns [`CompareError::ComparisonFailed`] carrying the run's recorded
    /// errors when a connection or a table (without `continue_on_error`) fails.
    pub async fn perform_full_comparison(&mut self, config: &ComparisonConfig) -> Result<ComparisonReport> {
        self.run(config, ComparisonScope::full(), "comp", FULL_OPERATION)
            .await
    }

    /// Runs the selected comparison dimensions.
    ///
    /// A full scope behaves like [`perform_full_comparison`](Self::perform_full_comparison)
    /// but still produces a `partial_` execution ID.
    pub async fn perform_comparison(
        &mut self,
        config: &ComparisonConfig,
        scope: ComparisonScope,
    ) -> Result<ComparisonReport> {
        self.run(config, scope, "partial", PARTIAL_OPERATION).await
    }

    async fn run(
        &mut self,
        config: &ComparisonConfig,
        scope: ComparisonScope,
        id_prefix: &str,
        operation: &str,
    ) -> Result<ComparisonReport> {
        let started = Instant::now();
        let timestamp = Utc::now();
        let execution_id = format!("{}_{}", id_prefix, timestamp.timestamp_millis());
        let mut run_errors = Vec::new();

        // Each run reads the catalog afresh.
        self.cache.clear();

        tracing::info!(
            "Starting {} {} ({} -> {})",
            operation,
            execution_id,
            self.source.safe_description(),
            self.target.safe_description()
        );

        let outcome = self.execute(config, scope, &mut run_errors).await;
        self.disconnect_all().await;

        let (counts, contents, structures, total_tables) = match outcome {
            Ok(results) => results,
            Err(error) => {
                tracing::error!("{} {} failed: {}", operation, execution_id, error);
                run_errors.push(ComparisonError::new(
                    operation,
                    "COMPARISON_FAILED",
                    error.to_string(),
                ));
                self.errors.extend(run_errors.iter().cloned());
                return Err(CompareError::ComparisonFailed {
                    errors: run_errors,
                    source: Box::new(error),
                });
            }
        };

        self.errors.extend(run_errors.iter().cloned());

        let summary = build_summary(total_tables, &counts, &contents, &structures, &run_errors);
        let execution_time = u64::try_from(started.elapsed().as_millis())
            .unwrap_or(u64::MAX)
            .max(1);

        tracing::info!(
            "Finished {} in {} ms: {} tables, integrity {:.1}%, {} critical, {} warnings",
            execution_id,
            execution_time,
            summary.total_tables,
            summary.overall_data_integrity,
            summary.critical_issues,
            summary.warnings
        );

        Ok(ComparisonReport {
            execution_id,
            timestamp,
            config: config.clone(),
            summary,
            count_results: counts,
            content_results: contents,
            structure_results: structures,
            errors: run_errors,
            execution_time,
        })
    }

    #[allow(clippy::type_complexity)]
    async fn execute(
        &mut self,
        config: &ComparisonConfig,
        scope: ComparisonScope,
        run_errors: &mut Vec<ComparisonError>,
    ) -> Result<(
        Vec<CountComparisonResult>,
        Vec<ContentComparisonResult>,
        Vec<StructureComparisonResult>,
        usize,
    )> {
        config.validate()?;
        self.connect_all().await?;

        let tables = config.effective_tables();
        let policy = OnTableError::from_config(config);

        let counts = if scope.count {
            tracing::info!("Comparing row counts for {} tables", tables.len());
            self.count_phase(&tables, policy, run_errors).await?
        } else {
            Vec::new()
        };

        let contents = if scope.content {
            tracing::info!(
                "Comparing content of {} tables (sample size {})",
                tables.len(),
                config.max_sample_size
            );
            let options = ContentOptions::from_config(config);
            self.content_phase(&tables, &options, policy, run_errors)
                .await?
        } else {
            Vec::new()
        };

        let structures = if scope.structure {
            tracing::info!("Comparing structure of {} tables", tables.len());
            self.structure_phase(&tables, policy, run_errors).await?
        } else {
            Vec::new()
        };

        Ok((counts, contents, structures, tables.len()))
    }

    async fn connect_all(&mut self) -> Result<()> {
        if !self.source.is_connected() {
            tracing::info!("Connecting to source {}", self.source.safe_description());
            self.source.connect().await?;
        }
        if !self.target.is_connected() {
            tracing::info!("Connecting to target {}", self.target.safe_description());
            self.target.connect().await?;
        }
        Ok(())
    }

    async fn disconnect_all(&mut self) {
        for conn in [&mut self.source, &mut self.target] {
            if conn.is_connected() {
                if let Err(e) = conn.disconnect().await {
                    tracing::warn!("Failed to disconnect {}: {}", conn.safe_description(), e);
                }
            }
        }
    }

    async fn count_phase(
        &self,
        tables: &[String],
        policy: OnTableError,
        run_errors: &mut Vec<ComparisonError>,
    ) -> Result<Vec<CountComparisonResult>> {
        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            match compare_counts(self.source(), self.target(), table).await {
                Ok(result) => results.push(result),
                Err(e) => handle_table_error("counts", table, e, policy, run_errors)?,
            }
        }
        Ok(results)
    }

    async fn content_phase(
        &self,
        tables: &[String],
        options: &ContentOptions,
        policy: OnTableError,
        run_errors: &mut Vec<ComparisonError>,
    ) -> Result<Vec<ContentComparisonResult>> {
        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            match compare_content(self.source(), self.target(), self.cache.as_ref(), table, options).await {
                Ok(result) => results.push(result),
                Err(e) => handle_table_error("content", table, e, policy, run_errors)?,
            }
        }
        Ok(results)
    }

    async fn structure_phase(
        &self,
        tables: &[String],
        policy: OnTableError,
        run_errors: &mut Vec<ComparisonError>,
    ) -> Result<Vec<StructureComparisonResult>> {
        let mut results = Vec::with_capacity(tables.len());
        for table in tables {
            match compare_structure(self.source(), self.target(), self.cache.as_ref(), table).await {
                Ok(result) => results.push(result),
                Err(e) => handle_table_error("structure", table, e, policy, run_errors)?,
            }
        }
        Ok(results)
    }
}

fn handle_table_error(
    operation: &str,
    table: &str,
    error: CompareError,
    policy: OnTableError,
    run_errors: &mut Vec<ComparisonError>,
) -> Result<()> {
    let error = CompareError::table_failed(operation, table, error);
    match policy {
        OnTableError::Abort => Err(error),
        OnTableError::Record => {
            tracing::warn!("Skipping table: {}", error);
            run_errors.push(ComparisonError::from_error(operation, &error).with_table(table));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryConnection;
    use crate::config::DatabaseConfig;
    use crate::models::{ColumnMetadata, DatabaseType, TableMetadata};
    use serde_json::json;

    fn config(tables: &[&str]) -> ComparisonConfig {
        ComparisonConfig::new(
            DatabaseConfig::new(DatabaseType::PostgreSQL, "pg.local", 5432, "app")
                .with_credentials("app", "pw"),
            DatabaseConfig::new(DatabaseType::Oracle, "ora.local", 1521, "APP")
                .with_credentials("app", "pw"),
            tables.iter().map(|t| t.to_string()).collect(),
        )
    }

    fn table(name: &str) -> TableMetadata {
        TableMetadata::new(name)
            .with_column(ColumnMetadata::new("id", "integer"))
            .with_primary_key(["id"])
    }

    fn rows(n: usize) -> Vec<serde_json::Value> {
        (1..=n).map(|i| json!({"id": i})).collect()
    }

    #[tokio::test]
    async fn test_full_comparison_clean_run() {
        let source = MemoryConnection::new(DatabaseType::PostgreSQL).with_table(table("users"), rows(3));
        let target = MemoryConnection::new(DatabaseType::Oracle).with_table(table("USERS"), rows(3));
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));

        let report = service.perform_full_comparison(&config(&["users"])).await.unwrap();
        assert!(report.execution_id.starts_with("comp_"));
        assert_eq!(report.summary.total_tables, 1);
        assert_eq!(report.summary.overall_data_integrity, 100.0);
        assert_eq!(report.count_results.len(), 1);
        assert_eq!(report.content_results.len(), 1);
        assert_eq!(report.structure_results.len(), 1);
        assert!(report.execution_time >= 1);
        assert!(!service.source().is_connected());
        assert!(!service.target().is_connected());
    }

    #[tokio::test]
    async fn test_table_failure_aborts_without_continue_on_error() {
        let source = MemoryConnection::new(DatabaseType::PostgreSQL)
            .with_table(table("users"), rows(1))
            .with_query_failure("orders");
        let target = MemoryConnection::new(DatabaseType::Oracle)
            .with_table(table("users"), rows(1))
            .with_table(table("orders"), rows(1));
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));

        let err = service
            .perform_full_comparison(&config(&["users", "orders"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to compare counts for table orders"));

        let CompareError::ComparisonFailed { errors, .. } = err else {
            panic!("expected ComparisonFailed");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "COMPARISON_FAILED");
        assert_eq!(errors[0].operation, "full_comparison");
        assert_eq!(service.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_continue_on_error_records_and_skips() {
        let source = MemoryConnection::new(DatabaseType::PostgreSQL)
            .with_table(table("users"), rows(2))
            .with_query_failure("orders");
        let target = MemoryConnection::new(DatabaseType::Oracle)
            .with_table(table("users"), rows(2))
            .with_table(table("orders"), rows(1));
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));

        let config = config(&["users", "orders"]).with_continue_on_error(true);
        let report = service.perform_full_comparison(&config).await.unwrap();

        assert_eq!(report.count_results.len(), 1);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors.iter().all(|e| e.code == "TABLE_COMPARISON_FAILED"));
        assert!(report.errors.iter().all(|e| e.table.as_deref() == Some("orders")));
        assert_eq!(report.summary.warnings, 3);
        assert_eq!(report.summary.tables_with_errors, 1);
        assert!((report.summary.overall_data_integrity - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_partial_comparison_runs_selected_scope() {
        let source = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 10);
        let target = MemoryConnection::new(DatabaseType::Oracle).with_row_count("users", 9);
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));

        let report = service
            .perform_comparison(&config(&["users"]), ComparisonScope::count_only())
            .await
            .unwrap();
        assert!(report.execution_id.starts_with("partial_"));
        assert_eq!(report.count_results.len(), 1);
        assert!(report.content_results.is_empty());
        assert!(report.structure_results.is_empty());
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_public_comparators_wrap_table_errors() {
        let mut source = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 1);
        let mut target = MemoryConnection::new(DatabaseType::Oracle);
        source.connect().await.unwrap();
        target.connect().await.unwrap();
        let service = ComparisonService::new(Box::new(source), Box::new(target));

        let err = service
            .compare_table_counts(&["users".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CompareError::TableComparison { ref operation, .. } if operation == "counts"));

        let err = service
            .compare_table_structure(&["users".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to compare structure for table users"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_the_run() {
        let source = MemoryConnection::new(DatabaseType::PostgreSQL);
        let target = MemoryConnection::new(DatabaseType::Oracle);
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));

        let err = service.perform_full_comparison(&config(&[])).await.unwrap_err();
        assert!(matches!(err, CompareError::ComparisonFailed { .. }));
    }

    /// Serves whatever metadata the shared handle currently holds.
    struct LiveCatalog {
        metadata: Arc<std::sync::Mutex<TableMetadata>>,
        connected: bool,
    }

    #[async_trait::async_trait]
    impl DatabaseConnection for LiveCatalog {
        async fn connect(&mut self) -> Result<()> {
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn execute_query(
            &self,
            _query: &str,
            _params: &[crate::models::QueryParam],
        ) -> Result<Vec<crate::models::Row>> {
            Ok(Vec::new())
        }

        async fn get_metadata(&self, _table: &str) -> Result<TableMetadata> {
            Ok(self.metadata.lock().unwrap().clone())
        }

        fn database_type(&self) -> DatabaseType {
            DatabaseType::Oracle
        }

        fn safe_description(&self) -> String {
            "live catalog".to_string()
        }
    }

    #[tokio::test]
    async fn test_second_run_sees_schema_changes() {
        let users = table("users").with_column(ColumnMetadata::new("email", "text"));
        let source = MemoryConnection::new(DatabaseType::PostgreSQL).with_table(users.clone(), rows(1));
        let target_catalog = Arc::new(std::sync::Mutex::new(users));
        let target = LiveCatalog {
            metadata: target_catalog.clone(),
            connected: false,
        };
        let mut service = ComparisonService::new(Box::new(source), Box::new(target));
        let config = config(&["users"]);

        let first = service
            .perform_comparison(&config, ComparisonScope::structure_only())
            .await
            .unwrap();
        assert!(first.structure_results[0].structure_match);

        *target_catalog.lock().unwrap() = table("users");

        let second = service
            .perform_comparison(&config, ComparisonScope::structure_only())
            .await
            .unwrap();
        let structure = &second.structure_results[0];
        assert!(!structure.structure_match);
        assert_eq!(structure.missing_columns, vec!["email".to_string()]);
    }
}
