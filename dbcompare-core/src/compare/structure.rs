//! Schema comparison between the two sides of a table.
//!
//! Column names are matched case-insensitively. Only the column sets decide
//! `structure_match`; column definition and index differences are reported
//! alongside.

use super::models::{ColumnDifference, ColumnProperty, StructureComparisonResult};
use crate::adapters::DatabaseConnection;
use crate::cache::{ComparisonSide, MetadataCache, cached_metadata};
use crate::models::{ColumnMetadata, IndexMetadata, TableMetadata};
use crate::Result;
use std::collections::{HashMap, HashSet};

/// Backend-neutral grouping of column types.
///
/// PostgreSQL and Oracle spell the same logical type differently
/// (`character varying` vs `VARCHAR2`, `integer` vs `NUMBER(10,0)`), so
/// types are compared by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeFamily {
    /// Whole numbers, including exact numerics with scale 0
    Integer,
    /// Exact numerics with a fractional part
    Decimal,
    /// Binary floating point
    Float,
    /// Variable-length character data
    Text,
    /// Blank-padded character data
    FixedText,
    /// Character large objects
    LargeText,
    /// True/false
    Boolean,
    /// Calendar date
    Date,
    /// Date and time without zone
    Timestamp,
    /// Date and time with zone
    TimestampTz,
    /// Byte strings and binary large objects
    Binary,
    /// JSON documents
    Json,
    /// UUIDs
    Uuid,
    /// Anything else, compared by its lower-cased name
    Other,
}

impl TypeFamily {
    fn is_character(self) -> bool {
        matches!(self, TypeFamily::Text | TypeFamily::FixedText)
    }
}

/// Maps a catalog column to its type family.
pub fn type_family(column: &ColumnMetadata) -> TypeFamily {
    let data_type = column.data_type.to_ascii_lowercase();
    // TIMESTAMP(6) WITH TIME ZONE -> timestamp with time zone
    let base = strip_modifiers(&data_type);

    match base.as_str() {
        "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" | "serial"
        | "bigserial" | "smallserial" | "pls_integer" | "binary_integer" => TypeFamily::Integer,
        "numeric" | "decimal" | "number" => match column.scale {
            Some(0) => TypeFamily::Integer,
            _ => TypeFamily::Decimal,
        },
        "real" | "float4" | "double precision" | "float8" | "float" | "binary_float"
        | "binary_double" => TypeFamily::Float,
        "character varying" | "varchar" | "varchar2" | "nvarchar2" => TypeFamily::Text,
        "character" | "char" | "bpchar" | "nchar" => TypeFamily::FixedText,
        "text" | "clob" | "nclob" | "long" => TypeFamily::LargeText,
        "boolean" | "bool" => TypeFamily::Boolean,
        "date" => TypeFamily::Date,
        "timestamp" | "timestamp without time zone" => TypeFamily::Timestamp,
        "timestamp with time zone" | "timestamptz" | "timestamp with local time zone" => {
            TypeFamily::TimestampTz
        }
        "bytea" | "blob" | "raw" | "long raw" => TypeFamily::Binary,
        "json" | "jsonb" => TypeFamily::Json,
        "uuid" => TypeFamily::Uuid,
        _ => TypeFamily::Other,
    }
}

fn strip_modifiers(data_type: &str) -> String {
    let mut out = String::with_capacity(data_type.len());
    let mut depth = 0usize;
    for ch in data_type.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compares two metadata snapshots of the same table.
pub fn diff_table_metadata(
    table: &str,
    source: &TableMetadata,
    target: &TableMetadata,
) -> StructureComparisonResult {
    let target_columns: HashMap<String, &ColumnMetadata> = target
        .columns
        .iter()
        .map(|c| (c.name.to_ascii_lowercase(), c))
        .collect();
    let source_names: HashSet<String> = source
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .collect();

    let mut missing_columns = Vec::new();
    let mut column_differences = Vec::new();
    for column in &source.columns {
        let name = column.name.to_ascii_lowercase();
        match target_columns.get(&name) {
            Some(target_column) => {
                diff_column(&name, column, target_column, &mut column_differences)
            }
            None => missing_columns.push(name),
        }
    }

    let extra_columns: Vec<String> = target
        .columns
        .iter()
        .map(|c| c.name.to_ascii_lowercase())
        .filter(|name| !source_names.contains(name))
        .collect();

    let source_indexes = index_signatures(&source.indexes);
    let target_indexes = index_signatures(&target.indexes);
    let missing_indexes = unmatched_indexes(&source_indexes, &target_indexes);
    let extra_indexes = unmatched_indexes(&target_indexes, &source_indexes);

    StructureComparisonResult {
        table_name: table.to_string(),
        structure_match: missing_columns.is_empty() && extra_columns.is_empty(),
        missing_columns,
        extra_columns,
        column_differences,
        missing_indexes,
        extra_indexes,
    }
}

fn diff_column(
    name: &str,
    source: &ColumnMetadata,
    target: &ColumnMetadata,
    differences: &mut Vec<ColumnDifference>,
) {
    let mut push = |property, source_value: String, target_value: String| {
        differences.push(ColumnDifference {
            column: name.to_string(),
            property,
            source_value,
            target_value,
        })
    };

    let source_family = type_family(source);
    let target_family = type_family(target);
    let same_family = if source_family == TypeFamily::Other || target_family == TypeFamily::Other {
        source.data_type.eq_ignore_ascii_case(&target.data_type)
    } else {
        source_family == target_family
    };

    if !same_family {
        push(
            ColumnProperty::DataType,
            source.data_type.clone(),
            target.data_type.clone(),
        );
        return;
    }

    if source.is_nullable != target.is_nullable {
        push(
            ColumnProperty::Nullability,
            nullability(source.is_nullable).to_string(),
            nullability(target.is_nullable).to_string(),
        );
    }

    if source_family.is_character() {
        if let (Some(s), Some(t)) = (source.max_length, target.max_length) {
            if s != t {
                push(ColumnProperty::MaxLength, s.to_string(), t.to_string());
            }
        }
    }

    if source_family == TypeFamily::Decimal {
        if let (Some(s), Some(t)) = (source.precision, target.precision) {
            if s != t {
                push(ColumnProperty::Precision, s.to_string(), t.to_string());
            }
        }
        if let (Some(s), Some(t)) = (source.scale, target.scale) {
            if s != t {
                push(ColumnProperty::Scale, s.to_string(), t.to_string());
            }
        }
    }
}

fn nullability(is_nullable: bool) -> &'static str {
    if is_nullable { "NULL" } else { "NOT NULL" }
}

/// Non-primary indexes keyed by uniqueness and lower-cased column list.
fn index_signatures(indexes: &[IndexMetadata]) -> Vec<((bool, String), String)> {
    indexes
        .iter()
        .filter(|index| !index.is_primary)
        .map(|index| {
            let columns = index
                .columns
                .iter()
                .map(|c| c.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(", ");
            let label = format!("{} ({})", index.name.to_ascii_lowercase(), columns);
            ((index.is_unique, columns), label)
        })
        .collect()
}

fn unmatched_indexes(
    left: &[((bool, String), String)],
    right: &[((bool, String), String)],
) -> Vec<String> {
    let right: HashSet<&(bool, String)> = right.iter().map(|(signature, _)| signature).collect();
    left.iter()
        .filter(|(signature, _)| !right.contains(signature))
        .map(|(_, label)| label.clone())
        .collect()
}

/// Compares one table's schema on both sides, reading metadata through the cache.
///
/// Errors are returned unwrapped; the caller adds the table context.
pub async fn compare_structure(
    source: &dyn DatabaseConnection,
    target: &dyn DatabaseConnection,
    cache: &dyn MetadataCache,
    table: &str,
) -> Result<StructureComparisonResult> {
    let source_metadata = cached_metadata(cache, ComparisonSide::Source, source, table).await?;
    let target_metadata = cached_metadata(cache, ComparisonSide::Target, target, table).await?;

    let result = diff_table_metadata(table, &source_metadata, &target_metadata);

    if result.structure_match {
        tracing::debug!(
            "{}: column sets match ({} column differences, {} index differences)",
            table,
            result.column_differences.len(),
            result.missing_indexes.len() + result.extra_indexes.len()
        );
    } else {
        tracing::warn!(
            "{}: structure mismatch, missing {:?} extra {:?}",
            table,
            result.missing_columns,
            result.extra_columns
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryConnection;
    use crate::cache::{NoopMetadataCache, TtlMetadataCache};
    use crate::models::DatabaseType;

    fn pg_users() -> TableMetadata {
        TableMetadata::new("users")
            .with_column(ColumnMetadata::new("id", "integer").with_nullable(false))
            .with_column(ColumnMetadata::new("email", "character varying").with_max_length(255))
            .with_column(ColumnMetadata::new("balance", "numeric").with_precision(12, 2))
            .with_column(ColumnMetadata::new("created_at", "timestamp without time zone"))
            .with_primary_key(["id"])
            .with_index(IndexMetadata::new("users_pkey", vec!["id".into()]).primary())
            .with_index(IndexMetadata::new("users_email_key", vec!["email".into()]).unique())
    }

    fn oracle_users() -> TableMetadata {
        TableMetadata::new("USERS")
            .with_column(
                ColumnMetadata::new("ID", "NUMBER")
                    .with_precision(10, 0)
                    .with_nullable(false),
            )
            .with_column(ColumnMetadata::new("EMAIL", "VARCHAR2").with_max_length(255))
            .with_column(ColumnMetadata::new("BALANCE", "NUMBER").with_precision(12, 2))
            .with_column(ColumnMetadata::new("CREATED_AT", "TIMESTAMP(6)"))
            .with_primary_key(["ID"])
            .with_index(IndexMetadata::new("SYS_C008123", vec!["ID".into()]).primary())
            .with_index(IndexMetadata::new("USERS_EMAIL_UK", vec!["EMAIL".into()]).unique())
    }

    #[test]
    fn test_type_families() {
        let family = |t: &str| type_family(&ColumnMetadata::new("c", t));
        assert_eq!(family("VARCHAR2"), TypeFamily::Text);
        assert_eq!(family("character varying"), TypeFamily::Text);
        assert_eq!(family("TIMESTAMP(6) WITH TIME ZONE"), TypeFamily::TimestampTz);
        assert_eq!(family("timestamp with time zone"), TypeFamily::TimestampTz);
        assert_eq!(family("CLOB"), TypeFamily::LargeText);
        assert_eq!(family("bpchar"), TypeFamily::FixedText);
        assert_eq!(family("BLOB"), TypeFamily::Binary);
        assert_eq!(family("NUMBER"), TypeFamily::Decimal);
        assert_eq!(family("geometry"), TypeFamily::Other);
        assert_eq!(
            type_family(&ColumnMetadata::new("c", "NUMBER").with_precision(19, 0)),
            TypeFamily::Integer
        );
    }

    #[test]
    fn test_equivalent_tables_match_across_backends() {
        let result = diff_table_metadata("users", &pg_users(), &oracle_users());
        assert!(result.structure_match);
        assert!(result.missing_columns.is_empty());
        assert!(result.extra_columns.is_empty());
        assert!(result.column_differences.is_empty(), "{:?}", result.column_differences);
        assert!(result.missing_indexes.is_empty());
        assert!(result.extra_indexes.is_empty());
    }

    #[test]
    fn test_missing_and_extra_columns() {
        let target = TableMetadata::new("USERS")
            .with_column(ColumnMetadata::new("ID", "NUMBER").with_precision(10, 0).with_nullable(false))
            .with_column(ColumnMetadata::new("LEGACY_CODE", "VARCHAR2"));

        let result = diff_table_metadata("users", &pg_users(), &target);
        assert!(!result.structure_match);
        assert_eq!(result.missing_columns, vec!["email", "balance", "created_at"]);
        assert_eq!(result.extra_columns, vec!["legacy_code"]);
    }

    #[test]
    fn test_column_differences_do_not_break_match() {
        let target = TableMetadata::new("USERS")
            .with_column(ColumnMetadata::new("ID", "VARCHAR2").with_nullable(false))
            .with_column(ColumnMetadata::new("EMAIL", "VARCHAR2").with_max_length(100).with_nullable(false))
            .with_column(ColumnMetadata::new("BALANCE", "NUMBER").with_precision(10, 4))
            .with_column(ColumnMetadata::new("CREATED_AT", "DATE"));

        let result = diff_table_metadata("users", &pg_users(), &target);
        assert!(result.structure_match);

        let properties: Vec<(&str, ColumnProperty)> = result
            .column_differences
            .iter()
            .map(|d| (d.column.as_str(), d.property))
            .collect();
        assert_eq!(
            properties,
            vec![
                ("id", ColumnProperty::DataType),
                ("email", ColumnProperty::Nullability),
                ("email", ColumnProperty::MaxLength),
                ("balance", ColumnProperty::Precision),
                ("balance", ColumnProperty::Scale),
                ("created_at", ColumnProperty::DataType),
            ]
        );
        assert_eq!(result.column_differences[0].source_value, "integer");
        assert_eq!(result.column_differences[0].target_value, "VARCHAR2");
        assert_eq!(result.column_differences[1].target_value, "NOT NULL");
    }

    #[test]
    fn test_index_differences_ignore_primary_keys() {
        let target = oracle_users()
            .with_index(IndexMetadata::new("USERS_CREATED_IDX", vec!["CREATED_AT".into()]));
        let mut source = pg_users();
        source.indexes.retain(|i| i.name != "users_email_key");

        let result = diff_table_metadata("users", &source, &target);
        assert!(result.missing_indexes.is_empty());
        assert_eq!(
            result.extra_indexes,
            vec!["users_email_uk (email)", "users_created_idx (created_at)"]
        );
    }

    #[test]
    fn test_uniqueness_is_part_of_index_signature() {
        let mut target = oracle_users();
        target.indexes[1].is_unique = false;

        let result = diff_table_metadata("users", &pg_users(), &target);
        assert_eq!(result.missing_indexes, vec!["users_email_key (email)"]);
        assert_eq!(result.extra_indexes, vec!["users_email_uk (email)"]);
    }

    #[tokio::test]
    async fn test_compare_structure_uses_cache() {
        let mut source = MemoryConnection::new(DatabaseType::PostgreSQL).with_table(pg_users(), vec![]);
        let mut target = MemoryConnection::new(DatabaseType::Oracle).with_table(oracle_users(), vec![]);
        let source_stats = source.stats();
        source.connect().await.unwrap();
        target.connect().await.unwrap();

        let cache = TtlMetadataCache::default();
        for _ in 0..2 {
            let result = compare_structure(&source, &target, &cache, "users").await.unwrap();
            assert!(result.structure_match);
        }
        assert_eq!(source_stats.metadata_requests(), 1);
    }

    #[tokio::test]
    async fn test_compare_structure_missing_metadata() {
        let mut source = MemoryConnection::new(DatabaseType::PostgreSQL).with_table(pg_users(), vec![]);
        let mut target = MemoryConnection::new(DatabaseType::Oracle);
        source.connect().await.unwrap();
        target.connect().await.unwrap();

        let err = compare_structure(&source, &target, &NoopMetadataCache, "users")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing table metadata: users");
    }
}
