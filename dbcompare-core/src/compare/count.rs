//! Row count comparison.

use super::models::CountComparisonResult;
use crate::adapters::DatabaseConnection;
use crate::Result;

/// Counts one table on both sides.
///
/// Errors are returned unwrapped; the caller adds the table context.
pub async fn compare_counts(
    source: &dyn DatabaseConnection,
    target: &dyn DatabaseConnection,
    table: &str,
) -> Result<CountComparisonResult> {
    let source_count = source.count_rows(table).await?;
    let target_count = target.count_rows(table).await?;
    let result = CountComparisonResult::new(table, source_count, target_count);

    if result.count_match {
        tracing::debug!("{}: {} rows on both sides", table, source_count);
    } else {
        tracing::warn!(
            "{}: row count mismatch, source {} target {} ({:.2}%)",
            table,
            source_count,
            target_count,
            result.percentage_diff
        );
    }

    Ok(result)
}
