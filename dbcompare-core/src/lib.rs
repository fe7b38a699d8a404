//! Cross-database comparison engine for validating PostgreSQL to Oracle migrations.
//!
//! The crate compares a source and a target database table by table along
//! three dimensions:
//! - row counts
//! - sampled row content, normalized across drivers
//! - column and index structure
//!
//! and renders the outcome as text, JSON, CSV or HTML.
//!
//! # Guarantees
//! - Credentials are never logged, displayed or serialized
//! - All database sessions are read-only
//! - Both connections are closed at the end of every run, success or failure
//!
//! # Architecture
//! - [`adapters::DatabaseConnection`] abstracts the backends behind one async trait
//! - [`adapters::create_connection`] builds a connection from configuration
//! - [`compare::ComparisonService`] sequences the comparators and builds the report
//! - [`report::ReportGenerator`] renders a finished [`compare::ComparisonReport`]
//!
//! # Example
//!
//! ```rust
//! use dbcompare_core::adapters::MemoryConnection;
//! use dbcompare_core::models::DatabaseType;
//! use dbcompare_core::{ComparisonConfig, ComparisonService, ReportGenerator};
//!
//! # #[tokio::main]
//! # async fn main() -> dbcompare_core::Result<()> {
//! let source = MemoryConnection::new(DatabaseType::PostgreSQL).with_row_count("users", 100);
//! let target = MemoryConnection::new(DatabaseType::Oracle).with_row_count("users", 100);
//!
//! let mut service = ComparisonService::new(Box::new(source), Box::new(target));
//! let config = ComparisonConfig::skeleton().with_tables(["users"]);
//! let report = service
//!     .perform_comparison(&config, dbcompare_core::ComparisonScope::count_only())
//!     .await?;
//!
//! let text = ReportGenerator::new().generate_report(&report);
//! assert!(text.contains("✓ users"));
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod report;

// Re-export commonly used types
pub use adapters::{DatabaseConnection, MemoryConnection, SqlDialect, create_connection};
pub use cache::{MetadataCache, NoopMetadataCache, TtlMetadataCache};
pub use compare::{
    ComparisonError, ComparisonReport, ComparisonScope, ComparisonService, ComparisonSummary,
    ContentComparisonResult, CountComparisonResult, StructureComparisonResult,
};
pub use config::{ComparisonConfig, ContentStrategy, DatabaseConfig};
pub use error::{CompareError, Result};
pub use models::{ColumnMetadata, DatabaseType, IndexMetadata, QueryParam, Row, TableMetadata};
pub use report::{ExportFormat, ReportGenerator};
