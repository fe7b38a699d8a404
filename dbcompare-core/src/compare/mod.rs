//! Comparators and the orchestrating service.
//!
//! Each comparator works on one table at a time through the
//! [`DatabaseConnection`](crate::adapters::DatabaseConnection) trait and never
//! branches on the backend kind. [`ComparisonService`] sequences them and
//! builds the [`ComparisonReport`].

pub mod content;
pub mod count;
pub mod models;
pub mod normalize;
pub mod service;
pub mod structure;
pub mod summary;

pub use content::{ContentOptions, compare_content, compare_rows};
pub use count::compare_counts;
pub use models::{
    ColumnDifference, ColumnProperty, ComparisonError, ComparisonReport, ComparisonScope,
    ComparisonSummary, ContentComparisonResult, CountComparisonResult, FieldDifference,
    StructureComparisonResult,
};
pub use service::ComparisonService;
pub use structure::{TypeFamily, compare_structure, diff_table_metadata, type_family};
pub use summary::build_summary;
