//! Run summary derived from the result lists.

use super::models::{
    ComparisonError, ComparisonSummary, ContentComparisonResult, CountComparisonResult,
    StructureComparisonResult,
};
use std::collections::BTreeSet;

/// Aggregates one run's results.
///
/// Issues are summed across the three dimensions without deduplication, so a
/// table with both a count and a structure mismatch counts twice against the
/// integrity score. A table that failed in any phase also counts once, since
/// its results are missing. The score is 100 for zero tables and clamped to
/// `[0, 100]`.
pub fn build_summary(
    total_tables: usize,
    counts: &[CountComparisonResult],
    contents: &[ContentComparisonResult],
    structures: &[StructureComparisonResult],
    errors: &[ComparisonError],
) -> ComparisonSummary {
    let tables_with_count_mismatch = counts.iter().filter(|r| !r.count_match).count();
    let tables_with_content_differences = contents.iter().filter(|r| r.has_differences()).count();
    let tables_with_structure_differences = structures.iter().filter(|r| !r.structure_match).count();

    let tables_with_errors = errors
        .iter()
        .filter_map(|e| e.table.as_deref())
        .map(str::to_ascii_lowercase)
        .collect::<BTreeSet<_>>()
        .len();

    let issues = tables_with_count_mismatch
        + tables_with_content_differences
        + tables_with_structure_differences
        + tables_with_errors;

    let overall_data_integrity = if total_tables == 0 {
        100.0
    } else {
        ((total_tables as f64 - issues as f64) / total_tables as f64 * 100.0).clamp(0.0, 100.0)
    };

    ComparisonSummary {
        total_tables,
        tables_with_count_mismatch,
        tables_with_content_differences,
        tables_with_structure_differences,
        tables_with_errors,
        overall_data_integrity,
        critical_issues: tables_with_count_mismatch + tables_with_structure_differences,
        warnings: tables_with_content_differences + errors.len(),
    }
}
