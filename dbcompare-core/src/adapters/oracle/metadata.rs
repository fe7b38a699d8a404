//! Oracle data dictionary reads for table metadata.

use super::OracleConnection;
use crate::adapters::DatabaseConnection;
use crate::adapters::dialect::split_qualified;
use crate::adapters::helpers::RowExt;
use crate::error::CompareError;
use crate::models::{ColumnMetadata, IndexMetadata, QueryParam, Row, TableMetadata};
use crate::Result;

const COLUMNS_QUERY: &str = "SELECT column_name, data_type, nullable, data_default, \
                                    char_length, data_precision, data_scale \
                               FROM all_tab_columns \
                              WHERE owner = :1 AND table_name = :2 \
                              ORDER BY column_id";

const PRIMARY_KEY_QUERY: &str = "SELECT acc.column_name \
                                   FROM all_cons_columns acc \
                                   JOIN all_constraints ac \
                                     ON acc.owner = ac.owner \
                                    AND acc.constraint_name = ac.constraint_name \
                                  WHERE ac.constraint_type = 'P' \
                                    AND ac.owner = :1 \
                                    AND ac.table_name = :2 \
                                  ORDER BY acc.position";

const INDEXES_QUERY: &str = "SELECT ai.index_name, ai.uniqueness, aic.column_name \
                               FROM all_indexes ai \
                               JOIN all_ind_columns aic \
                                 ON aic.index_owner = ai.owner \
                                AND aic.index_name = ai.index_name \
                              WHERE ai.table_owner = :1 \
                                AND ai.table_name = :2 \
                              ORDER BY ai.index_name, aic.column_position";

/// Reads columns, primary key and indexes for one table.
pub(crate) async fn collect_table_metadata(
    conn: &OracleConnection,
    table: &str,
) -> Result<TableMetadata> {
    let (embedded_owner, bare_table) = split_qualified(table);
    let owner = embedded_owner
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| conn.owner());
    let table_name = bare_table.to_ascii_uppercase();
    let params = [QueryParam::from(owner.as_str()), QueryParam::from(table_name.as_str())];

    tracing::debug!("Reading Oracle dictionary for {}.{}", owner, table_name);

    let column_rows = conn.execute_query(COLUMNS_QUERY, &params).await?;
    if column_rows.is_empty() {
        return Err(CompareError::missing_metadata(table));
    }

    let columns = column_rows
        .iter()
        .map(|row| column_from_row(row, table))
        .collect::<Result<Vec<_>>>()?;

    let primary_keys = conn
        .execute_query(PRIMARY_KEY_QUERY, &params)
        .await?
        .iter()
        .map(|row| row.require_str("column_name", table))
        .collect::<Result<Vec<_>>>()?;

    let index_rows = conn.execute_query(INDEXES_QUERY, &params).await?;
    let indexes = group_index_rows(&index_rows, &primary_keys, table)?;

    Ok(TableMetadata {
        name: table_name,
        schema: Some(owner),
        columns,
        primary_keys,
        indexes,
    })
}

fn column_from_row(row: &Row, table: &str) -> Result<ColumnMetadata> {
    // CHAR_LENGTH is 0 for non-character columns
    let max_length = row.get_i64("char_length").filter(|len| *len > 0);

    Ok(ColumnMetadata {
        name: row.require_str("column_name", table)?,
        data_type: row.require_str("data_type", table)?,
        is_nullable: row.get_flag("nullable"),
        default_value: row
            .get_str("data_default")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        max_length,
        precision: row.get_i64("data_precision"),
        scale: row.get_i64("data_scale"),
    })
}

/// Folds one-row-per-column index rows into indexes.
///
/// Rows must arrive ordered by index name and column position. An index is
/// flagged primary when it is unique and covers exactly the primary key.
pub fn group_index_rows(
    rows: &[Row],
    primary_keys: &[String],
    table: &str,
) -> Result<Vec<IndexMetadata>> {
    let mut indexes: Vec<IndexMetadata> = Vec::new();

    for row in rows {
        let name = row.require_str("index_name", table)?;
        let column = row.require_str("column_name", table)?;

        match indexes.last_mut() {
            Some(current) if current.name == name => current.columns.push(column),
            _ => {
                let mut index = IndexMetadata::new(name, vec![column]);
                index.is_unique = row
                    .get_str("uniqueness")
                    .is_some_and(|u| u.eq_ignore_ascii_case("UNIQUE"));
                indexes.push(index);
            }
        }
    }

    for index in &mut indexes {
        index.is_primary = index.is_unique
            && !primary_keys.is_empty()
            && index.columns.len() == primary_keys.len()
            && index
                .columns
                .iter()
                .zip(primary_keys)
                .all(|(a, b)| a.eq_ignore_ascii_case(b));
    }

    Ok(indexes)
}
