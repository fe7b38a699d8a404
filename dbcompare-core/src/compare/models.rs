//! Comparison result models.
//!
//! Field names serialize in camelCase so an exported report matches the
//! documented JSON report format.

use crate::config::{ComparisonConfig, ContentStrategy};
use crate::error::CompareError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row count comparison for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountComparisonResult {
    /// Table name as configured
    pub table_name: String,
    /// Rows in the source table
    pub source_count: u64,
    /// Rows in the target table
    pub target_count: u64,
    /// Whether both counts are equal
    pub count_match: bool,
    /// Absolute count difference
    pub difference: u64,
    /// Difference as a percentage of the source count; 0 when the source is empty
    pub percentage_diff: f64,
}

impl CountComparisonResult {
    /// Derives match, difference and percentage from the two counts.
    pub fn new(table_name: impl Into<String>, source_count: u64, target_count: u64) -> Self {
        let difference = source_count.abs_diff(target_count);
        let percentage_diff = if source_count == 0 {
            0.0
        } else {
            difference as f64 / source_count as f64 * 100.0
        };

        Self {
            table_name: table_name.into(),
            source_count,
            target_count,
            count_match: difference == 0,
            difference,
            percentage_diff,
        }
    }
}

/// One differing field between a paired source and target row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDifference {
    /// Row locator: `#<index>` for positional pairing, `col=value` for key pairing
    pub record_key: String,
    /// Lower-cased column name
    pub column: String,
    /// Normalized source value (`null` when the column is absent)
    pub source_value: Value,
    /// Normalized target value (`null` when the column is absent)
    pub target_value: Value,
}

/// Sampled row comparison for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentComparisonResult {
    /// Table name as configured
    pub table_name: String,
    /// Larger of the two sample lengths
    pub total_records: usize,
    /// Number of paired rows that were compared
    pub sampled_records: usize,
    /// Paired rows equal after normalization
    pub exact_matches: usize,
    /// Paired rows with at least one differing field
    pub partial_matches: usize,
    /// Source rows without a target counterpart
    pub missing_in_target: usize,
    /// Target rows without a source counterpart
    pub extra_in_target: usize,
    /// Field-level differences, capped per table
    pub field_differences: Vec<FieldDifference>,
    /// Field differences dropped because of the cap
    #[serde(default)]
    pub omitted_differences: usize,
    /// Pairing strategy that was actually applied
    pub strategy_used: ContentStrategy,
}

impl ContentComparisonResult {
    /// Empty result for a table.
    pub fn new(table_name: impl Into<String>, strategy_used: ContentStrategy) -> Self {
        Self {
            table_name: table_name.into(),
            total_records: 0,
            sampled_records: 0,
            exact_matches: 0,
            partial_matches: 0,
            missing_in_target: 0,
            extra_in_target: 0,
            field_differences: Vec::new(),
            omitted_differences: 0,
            strategy_used,
        }
    }

    /// Whether any sampled row failed to match exactly.
    pub fn has_differences(&self) -> bool {
        self.exact_matches < self.total_records
            || self.missing_in_target > 0
            || self.extra_in_target > 0
    }
}

/// Column property that differs between source and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnProperty {
    /// Normalized type family
    DataType,
    /// NULL allowed or not
    Nullability,
    /// Character length
    MaxLength,
    /// Numeric precision
    Precision,
    /// Numeric scale
    Scale,
}

impl std::fmt::Display for ColumnProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnProperty::DataType => "data type",
            ColumnProperty::Nullability => "nullability",
            ColumnProperty::MaxLength => "max length",
            ColumnProperty::Precision => "precision",
            ColumnProperty::Scale => "scale",
        };
        f.write_str(name)
    }
}

/// A column present on both sides whose definition differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDifference {
    /// Lower-cased column name
    pub column: String,
    /// Differing property
    pub property: ColumnProperty,
    /// Source side value, rendered
    pub source_value: String,
    /// Target side value, rendered
    pub target_value: String,
}

/// Schema comparison for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureComparisonResult {
    /// Table name as configured
    pub table_name: String,
    /// Column sets are equal (ignoring case)
    pub structure_match: bool,
    /// Columns in source but not in target
    pub missing_columns: Vec<String>,
    /// Columns in target but not in source
    pub extra_columns: Vec<String>,
    /// Definition differences of shared columns
    pub column_differences: Vec<ColumnDifference>,
    /// Source index signatures without a target counterpart
    pub missing_indexes: Vec<String>,
    /// Target index signatures without a source counterpart
    pub extra_indexes: Vec<String>,
}

/// A failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonError {
    /// Operation that failed (`full_comparison`, `counts`, ...)
    pub operation: String,
    /// Stable error code
    pub code: String,
    /// Human-readable message, credential free
    pub message: String,
    /// Table involved, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// When the failure was recorded
    pub timestamp: DateTime<Utc>,
}

impl ComparisonError {
    /// Creates an error entry stamped with the current time.
    pub fn new(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
            table: None,
            timestamp: Utc::now(),
        }
    }

    /// Records a `CompareError` under its own code.
    pub fn from_error(operation: impl Into<String>, error: &CompareError) -> Self {
        Self::new(operation, error.code(), error.to_string())
    }

    /// Builder method to attach the table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// Aggregate view over one run's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    /// Tables in the run
    pub total_tables: usize,
    /// Tables whose row counts differ
    pub tables_with_count_mismatch: usize,
    /// Tables whose sampled rows differ
    pub tables_with_content_differences: usize,
    /// Tables whose column sets differ
    pub tables_with_structure_differences: usize,
    /// Tables skipped after a recorded failure
    #[serde(default)]
    pub tables_with_errors: usize,
    /// Percentage of tables without issues, in `[0, 100]`
    pub overall_data_integrity: f64,
    /// Count plus structure mismatches
    pub critical_issues: usize,
    /// Content differences plus recorded errors
    pub warnings: usize,
}

/// Which comparison dimensions a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonScope {
    /// Row counts
    pub count: bool,
    /// Sampled row content
    pub content: bool,
    /// Column and index structure
    pub structure: bool,
}

impl Default for ComparisonScope {
    fn default() -> Self {
        Self::full()
    }
}

impl ComparisonScope {
    /// All three dimensions.
    pub fn full() -> Self {
        Self {
            count: true,
            content: true,
            structure: true,
        }
    }

    /// Row counts only.
    pub fn count_only() -> Self {
        Self {
            count: true,
            content: false,
            structure: false,
        }
    }

    /// Sampled content only.
    pub fn content_only() -> Self {
        Self {
            count: false,
            content: true,
            structure: false,
        }
    }

    /// Structure only.
    pub fn structure_only() -> Self {
        Self {
            count: false,
            content: false,
            structure: true,
        }
    }

    /// Whether every dimension is selected.
    pub fn is_full(&self) -> bool {
        self.count && self.content && self.structure
    }
}

/// Complete result of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    /// `comp_<epoch-ms>` for full runs, `partial_<epoch-ms>` for scoped runs
    pub execution_id: String,
    /// Run start time
    pub timestamp: DateTime<Utc>,
    /// Configuration the run used (passwords are never serialized)
    pub config: ComparisonConfig,
    /// Aggregate view
    pub summary: ComparisonSummary,
    /// Row count results
    pub count_results: Vec<CountComparisonResult>,
    /// Sampled content results
    pub content_results: Vec<ContentComparisonResult>,
    /// Structure results
    pub structure_results: Vec<StructureComparisonResult>,
    /// Failures recorded during the run
    pub errors: Vec<ComparisonError>,
    /// Wall time in milliseconds, at least 1
    pub execution_time: u64,
}

impl ComparisonReport {
    /// Tables whose row counts differ.
    pub fn count_mismatches(&self) -> impl Iterator<Item = &CountComparisonResult> {
        self.count_results.iter().filter(|r| !r.count_match)
    }

    /// Process exit status for command-line wrappers: 1 on any count mismatch.
    pub fn exit_code(&self) -> i32 {
        if self.count_mismatches().next().is_some() {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_result_equal_counts() {
        let result = CountComparisonResult::new("users", 100, 100);
        assert!(result.count_match);
        assert_eq!(result.difference, 0);
        assert_eq!(result.percentage_diff, 0.0);
    }

    #[test]
    fn test_count_result_empty_source() {
        let result = CountComparisonResult::new("empty", 0, 0);
        assert_eq!(result.percentage_diff, 0.0);
        assert!(result.count_match);

        let result = CountComparisonResult::new("grown", 0, 7);
        assert_eq!(result.percentage_diff, 0.0);
        assert_eq!(result.difference, 7);
        assert!(!result.count_match);
    }

    #[test]
    fn test_count_result_percentage() {
        let result = CountComparisonResult::new("orders", 200, 150);
        assert_eq!(result.difference, 50);
        assert!((result.percentage_diff - 25.0).abs() < 1e-9);

        let result = CountComparisonResult::new("projects", 50, 45);
        assert_eq!(result.difference, 5);
        assert!((result.percentage_diff - 10.0).abs() < 1e-9);

        let result = CountComparisonResult::new("inverse", 150, 200);
        assert_eq!(result.difference, 50);
    }

    #[test]
    fn test_content_has_differences() {
        let mut result = ContentComparisonResult::new("users", ContentStrategy::Positional);
        assert!(!result.has_differences());

        result.total_records = 3;
        result.exact_matches = 3;
        assert!(!result.has_differences());

        result.extra_in_target = 1;
        assert!(result.has_differences());
    }

    #[test]
    fn test_comparison_error_from_error() {
        let err = CompareError::missing_metadata("ghost");
        let entry = ComparisonError::from_error("structure", &err).with_table("ghost");
        assert_eq!(entry.code, "MISSING_METADATA");
        assert_eq!(entry.message, "Missing table metadata: ghost");
        assert_eq!(entry.table.as_deref(), Some("ghost"));
    }

    #[test]
    fn test_scope_constructors() {
        assert!(ComparisonScope::full().is_full());
        assert!(ComparisonScope::default().is_full());
        let scope = ComparisonScope::count_only();
        assert!(scope.count && !scope.content && !scope.structure);
        assert!(!ComparisonScope::structure_only().is_full());
    }

    #[test]
    fn test_count_result_serializes_camel_case() {
        let json = serde_json::to_value(CountComparisonResult::new("users", 1, 1)).unwrap();
        assert!(json.get("tableName").is_some());
        assert!(json.get("countMatch").is_some());
        assert!(json.get("percentageDiff").is_some());
    }
}
