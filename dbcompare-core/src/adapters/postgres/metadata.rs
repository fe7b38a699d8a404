//! PostgreSQL catalog reads for table metadata.

use super::PostgresConnection;
use crate::adapters::DatabaseConnection;
use crate::adapters::dialect::split_qualified;
use crate::adapters::helpers::RowExt;
use crate::error::CompareError;
use crate::models::{ColumnMetadata, IndexMetadata, QueryParam, Row, TableMetadata};
use crate::Result;

const COLUMNS_QUERY: &str = r#"
    SELECT
        column_name::text AS column_name,
        data_type::text AS data_type,
        (is_nullable = 'YES') AS is_nullable,
        column_default::text AS column_default,
        character_maximum_length::bigint AS max_length,
        numeric_precision::bigint AS numeric_precision,
        numeric_scale::bigint AS numeric_scale
    FROM information_schema.columns
    WHERE table_schema = $1 AND table_name = $2
    ORDER BY ordinal_position
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        i.relname::text AS index_name,
        ix.indisunique AS is_unique,
        ix.indisprimary AS is_primary,
        array_to_string(array_agg(a.attname::text ORDER BY k.ord), ',') AS column_names
    FROM pg_index ix
    JOIN pg_class t ON t.oid = ix.indrelid
    JOIN pg_class i ON i.oid = ix.indexrelid
    JOIN pg_namespace n ON n.oid = t.relnamespace
    CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
    JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
    WHERE n.nspname = $1 AND t.relname = $2
    GROUP BY i.relname, ix.indisunique, ix.indisprimary
    ORDER BY i.relname
"#;

/// Reads columns, primary key and indexes for one table.
pub(crate) async fn collect_table_metadata(
    conn: &PostgresConnection,
    table: &str,
) -> Result<TableMetadata> {
    let (embedded_schema, bare_table) = split_qualified(table);
    let schema = embedded_schema
        .unwrap_or_else(|| conn.catalog_schema())
        .to_ascii_lowercase();
    let bare_table = bare_table.to_ascii_lowercase();
    let params = [QueryParam::from(schema.as_str()), QueryParam::from(bare_table.as_str())];

    tracing::debug!("Reading PostgreSQL catalog for {}.{}", schema, bare_table);

    let column_rows = conn.execute_query(COLUMNS_QUERY, &params).await?;
    if column_rows.is_empty() {
        return Err(CompareError::missing_metadata(table));
    }

    let columns = column_rows
        .iter()
        .map(|row| column_from_row(row, table))
        .collect::<Result<Vec<_>>>()?;

    let indexes = conn
        .execute_query(INDEXES_QUERY, &params)
        .await?
        .iter()
        .map(|row| index_from_row(row, table))
        .collect::<Result<Vec<_>>>()?;

    let primary_keys = indexes
        .iter()
        .find(|idx| idx.is_primary)
        .map(|idx| idx.columns.clone())
        .unwrap_or_default();

    Ok(TableMetadata {
        name: bare_table.to_string(),
        schema: Some(schema.to_string()),
        columns,
        primary_keys,
        indexes,
    })
}

/// Converts an `information_schema.columns` row.
pub fn column_from_row(row: &Row, table: &str) -> Result<ColumnMetadata> {
    Ok(ColumnMetadata {
        name: row.require_str("column_name", table)?,
        data_type: row.require_str("data_type", table)?,
        is_nullable: row.get_flag("is_nullable"),
        default_value: row.get_str("column_default"),
        max_length: row.get_i64("max_length"),
        precision: row.get_i64("numeric_precision"),
        scale: row.get_i64("numeric_scale"),
    })
}

/// Converts an index row with comma-joined column names.
pub fn index_from_row(row: &Row, table: &str) -> Result<IndexMetadata> {
    let columns = row
        .require_str("column_names", table)?
        .split(',')
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    Ok(IndexMetadata {
        name: row.require_str("index_name", table)?,
        columns,
        is_unique: row.get_flag("is_unique"),
        is_primary: row.get_flag("is_primary"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_column_from_row() {
        let column = column_from_row(
            &row(json!({
                "column_name": "budget",
                "data_type": "numeric",
                "is_nullable": false,
                "column_default": "0",
                "max_length": null,
                "numeric_precision": 12,
                "numeric_scale": 2
            })),
            "projects",
        )
        .unwrap();

        assert_eq!(column.name, "budget");
        assert_eq!(column.data_type, "numeric");
        assert!(!column.is_nullable);
        assert_eq!(column.default_value.as_deref(), Some("0"));
        assert_eq!(column.precision, Some(12));
        assert_eq!(column.scale, Some(2));
        assert_eq!(column.max_length, None);
    }

    #[test]
    fn test_column_from_row_missing_name() {
        let err = column_from_row(&row(json!({"data_type": "text"})), "projects").unwrap_err();
        assert!(matches!(err, CompareError::Decode { .. }));
    }

    #[test]
    fn test_index_from_row() {
        let index = index_from_row(
            &row(json!({
                "index_name": "projects_owner_status_idx",
                "is_unique": false,
                "is_primary": false,
                "column_names": "owner_id,status"
            })),
            "projects",
        )
        .unwrap();

        assert_eq!(index.columns, vec!["owner_id", "status"]);
        assert!(!index.is_unique);
        assert!(!index.is_primary);
    }
}
