//! SQL construction for the two supported dialects.
//!
//! Comparators never build SQL themselves; the provided methods on
//! [`DatabaseConnection`](super::DatabaseConnection) ask the connection's
//! dialect for the statement and the placeholder syntax.

use crate::error::CompareError;
use crate::models::DatabaseType;
use crate::Result;
use std::sync::OnceLock;

/// Dialect-specific SQL rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// PostgreSQL: double-quoted identifiers, `$n` placeholders, `LIMIT`
    Postgres,
    /// Oracle: upper-cased identifiers, `:n` placeholders, `FETCH FIRST`
    Oracle,
}

fn identifier_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]{0,127}$").expect("Invalid identifier pattern")
    })
}

/// Checks that a table, schema or column name is a plain identifier.
///
/// Names are interpolated into SQL, so anything outside letters, digits,
/// `_`, `$` and `#` is rejected rather than escaped.
pub fn validate_identifier(name: &str) -> Result<()> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        Err(CompareError::configuration(format!(
            "invalid identifier: {:?}",
            name
        )))
    }
}

/// Splits `schema.table` into its parts; a bare name has no schema.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

impl SqlDialect {
    /// Dialect spoken by a backend.
    pub fn for_database(database_type: DatabaseType) -> Self {
        match database_type {
            DatabaseType::PostgreSQL => Self::Postgres,
            DatabaseType::Oracle => Self::Oracle,
        }
    }

    /// Quotes a validated identifier.
    ///
    /// Both dialects fold names the way unquoted DDL created them: PostgreSQL
    /// names are lower-cased and quoted, Oracle names are upper-cased and
    /// left unquoted. `USERS` and `users` name the same table on either side.
    pub fn quote_identifier(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(match self {
            Self::Postgres => format!("\"{}\"", name.to_ascii_lowercase()),
            Self::Oracle => name.to_ascii_uppercase(),
        })
    }

    /// Schema-qualified table reference.
    ///
    /// A schema embedded in `table` (`schema.table`) wins over `default_schema`.
    pub fn qualified_table(&self, default_schema: Option<&str>, table: &str) -> Result<String> {
        let (embedded, bare) = split_qualified(table);
        let table_ref = self.quote_identifier(bare)?;
        match embedded.or(default_schema) {
            Some(schema) => Ok(format!("{}.{}", self.quote_identifier(schema)?, table_ref)),
            None => Ok(table_ref),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::Oracle => format!(":{}", index),
        }
    }

    /// `SELECT COUNT(*)` for a table.
    pub fn count_query(&self, schema: Option<&str>, table: &str) -> Result<String> {
        Ok(format!(
            "SELECT COUNT(*) AS row_count FROM {}",
            self.qualified_table(schema, table)?
        ))
    }

    /// First-N row sample, ordered by `order_by` when given.
    ///
    /// The row limit is bound as parameter 1.
    pub fn sample_query(
        &self,
        schema: Option<&str>,
        table: &str,
        order_by: &[String],
    ) -> Result<String> {
        let mut sql = format!("SELECT * FROM {}", self.qualified_table(schema, table)?);

        if !order_by.is_empty() {
            let columns = order_by
                .iter()
                .map(|c| self.quote_identifier(c))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&columns.join(", "));
        }

        match self {
            Self::Postgres => sql.push_str(&format!(" LIMIT {}", self.placeholder(1))),
            Self::Oracle => sql.push_str(&format!(
                " FETCH FIRST {} ROWS ONLY",
                self.placeholder(1)
            )),
        }

        Ok(sql)
    }
}
