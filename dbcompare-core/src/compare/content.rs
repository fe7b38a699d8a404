//! Sampled row content comparison.
//!
//! Up to `sample_size` rows are read from each side, ordered by each side's
//! primary key when it has one, normalized, and paired either by position or
//! by primary key value.

use super::models::{ContentComparisonResult, FieldDifference};
use super::normalize::{CanonicalRow, exclusion_set, normalize_row, record_key};
use crate::adapters::DatabaseConnection;
use crate::cache::{ComparisonSide, MetadataCache, cached_metadata};
use crate::config::{ComparisonConfig, ContentStrategy};
use crate::error::CompareError;
use crate::models::Row;
use crate::Result;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Tuning for the content comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOptions {
    /// Rows fetched per side
    pub sample_size: usize,
    /// Row pairing
    pub strategy: ContentStrategy,
    /// Columns left out of the comparison
    pub exclude_columns: Vec<String>,
    /// Cap on recorded field differences per table
    pub max_field_differences: usize,
    /// Rows compared between progress log lines
    pub batch_size: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            strategy: ContentStrategy::Positional,
            exclude_columns: Vec::new(),
            max_field_differences: 100,
            batch_size: 100,
        }
    }
}

impl ContentOptions {
    /// Options taken from a run configuration.
    pub fn from_config(config: &ComparisonConfig) -> Self {
        Self {
            sample_size: config.max_sample_size,
            strategy: config.content_strategy,
            exclude_columns: config.exclude_columns.clone(),
            max_field_differences: config.max_field_differences,
            batch_size: config.batch_size,
        }
    }

    /// Builder method to set the sample size.
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Builder method to set the pairing strategy.
    pub fn with_strategy(mut self, strategy: ContentStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Primary key columns of one side, or none when the catalog has no entry.
async fn primary_key_of(
    cache: &dyn MetadataCache,
    side: ComparisonSide,
    conn: &dyn DatabaseConnection,
    table: &str,
) -> Result<Vec<String>> {
    match cached_metadata(cache, side, conn, table).await {
        Ok(metadata) => Ok(metadata.primary_keys),
        Err(CompareError::MissingMetadata { .. }) => {
            tracing::debug!("{}: no {} catalog entry, sampling unordered", table, side);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Samples one table on both sides and compares the rows.
///
/// Errors are returned unwrapped; the caller adds the table context.
pub async fn compare_content(
    source: &dyn DatabaseConnection,
    target: &dyn DatabaseConnection,
    cache: &dyn MetadataCache,
    table: &str,
    options: &ContentOptions,
) -> Result<ContentComparisonResult> {
    let source_key = primary_key_of(cache, ComparisonSide::Source, source, table).await?;
    let target_key = primary_key_of(cache, ComparisonSide::Target, target, table).await?;

    let source_rows = source
        .fetch_sample(table, &source_key, options.sample_size)
        .await?;
    let target_rows = target
        .fetch_sample(table, &target_key, options.sample_size)
        .await?;

    tracing::debug!(
        "{}: sampled {} source rows and {} target rows",
        table,
        source_rows.len(),
        target_rows.len()
    );

    let result = compare_rows(table, &source_rows, &target_rows, &source_key, options);

    if result.has_differences() {
        tracing::warn!(
            "{}: content differs ({} exact, {} partial, {} missing, {} extra)",
            table,
            result.exact_matches,
            result.partial_matches,
            result.missing_in_target,
            result.extra_in_target
        );
    }

    Ok(result)
}

/// Compares two row samples.
///
/// `primary_keys` is only used by [`ContentStrategy::PrimaryKey`]; when it is
/// empty the comparison falls back to positional pairing and reports that in
/// `strategy_used`.
pub fn compare_rows(
    table: &str,
    source: &[Row],
    target: &[Row],
    primary_keys: &[String],
    options: &ContentOptions,
) -> ContentComparisonResult {
    let excluded = exclusion_set(&options.exclude_columns);
    let source: Vec<CanonicalRow> = source.iter().map(|r| normalize_row(r, &excluded)).collect();
    let target: Vec<CanonicalRow> = target.iter().map(|r| normalize_row(r, &excluded)).collect();

    let key_columns: Vec<String> = primary_keys
        .iter()
        .map(|k| k.to_ascii_lowercase())
        .filter(|k| !excluded.contains(k))
        .collect();

    let mut collector = DifferenceCollector::new(options.max_field_differences);

    let mut result = match options.strategy {
        ContentStrategy::PrimaryKey if !key_columns.is_empty() => {
            compare_by_key(table, &source, &target, &key_columns, options, &mut collector)
        }
        ContentStrategy::PrimaryKey => {
            tracing::warn!("{}: no primary key, falling back to positional comparison", table);
            compare_positional(table, &source, &target, options, &mut collector)
        }
        ContentStrategy::Positional => {
            compare_positional(table, &source, &target, options, &mut collector)
        }
    };

    result.total_records = source.len().max(target.len());
    result.field_differences = collector.differences;
    result.omitted_differences = collector.omitted;
    result
}

fn compare_positional(
    table: &str,
    source: &[CanonicalRow],
    target: &[CanonicalRow],
    options: &ContentOptions,
    collector: &mut DifferenceCollector,
) -> ContentComparisonResult {
    let mut result = ContentComparisonResult::new(table, ContentStrategy::Positional);
    let paired = source.len().min(target.len());

    for (index, (s, t)) in source.iter().zip(target).enumerate() {
        if s == t {
            result.exact_matches += 1;
        } else {
            result.partial_matches += 1;
            collector.record(&format!("#{}", index + 1), s, t);
        }
        log_progress(table, index + 1, paired, options.batch_size);
    }

    result.sampled_records = paired;
    result.missing_in_target = source.len() - paired;
    result.extra_in_target = target.len() - paired;
    result
}

fn compare_by_key(
    table: &str,
    source: &[CanonicalRow],
    target: &[CanonicalRow],
    key_columns: &[String],
    options: &ContentOptions,
    collector: &mut DifferenceCollector,
) -> ContentComparisonResult {
    let mut result = ContentComparisonResult::new(table, ContentStrategy::PrimaryKey);

    let target_by_key: HashMap<String, &CanonicalRow> = target
        .iter()
        .map(|row| (record_key(row, key_columns), row))
        .collect();

    let mut matched_keys = HashSet::new();
    for (index, row) in source.iter().enumerate() {
        let key = record_key(row, key_columns);
        match target_by_key.get(&key) {
            Some(target_row) => {
                if row == *target_row {
                    result.exact_matches += 1;
                } else {
                    result.partial_matches += 1;
                    collector.record(&key, row, target_row);
                }
                matched_keys.insert(key);
            }
            None => result.missing_in_target += 1,
        }
        log_progress(table, index + 1, source.len(), options.batch_size);
    }

    result.sampled_records = matched_keys.len();
    result.extra_in_target = target_by_key
        .keys()
        .filter(|key| !matched_keys.contains(*key))
        .count();
    result
}

fn log_progress(table: &str, done: usize, total: usize, batch_size: usize) {
    if batch_size > 0 && (done % batch_size == 0 || done == total) {
        tracing::debug!("{}: compared {}/{} rows", table, done, total);
    }
}

struct DifferenceCollector {
    limit: usize,
    differences: Vec<FieldDifference>,
    omitted: usize,
}

impl DifferenceCollector {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            differences: Vec::new(),
            omitted: 0,
        }
    }

    fn record(&mut self, record_key: &str, source: &CanonicalRow, target: &CanonicalRow) {
        let columns: BTreeSet<&String> = source.keys().chain(target.keys()).collect();

        for column in columns {
            let source_value = source.get(column).unwrap_or(&Value::Null);
            let target_value = target.get(column).unwrap_or(&Value::Null);
            if source_value == target_value {
                continue;
            }

            if self.differences.len() < self.limit {
                self.differences.push(FieldDifference {
                    record_key: record_key.to_string(),
                    column: column.clone(),
                    source_value: source_value.clone(),
                    target_value: target_value.clone(),
                });
            } else {
                self.omitted += 1;
            }
        }
    }
}
