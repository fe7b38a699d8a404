//! Comparison run configuration and the configuration file format.

use super::DatabaseConfig;
use crate::error::CompareError;
use crate::models::DatabaseType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How sampled rows are paired between source and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentStrategy {
    /// Pair the i-th source row with the i-th target row
    #[default]
    Positional,
    /// Pair rows by primary key value
    PrimaryKey,
}

impl std::fmt::Display for ContentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentStrategy::Positional => write!(f, "positional"),
            ContentStrategy::PrimaryKey => write!(f, "primary key"),
        }
    }
}

fn default_max_sample_size() -> usize {
    1000
}

fn default_batch_size() -> usize {
    100
}

fn default_max_field_differences() -> usize {
    100
}

const MAX_SAMPLE_SIZE_LIMIT: usize = 1_000_000;

/// Full configuration of a comparison run.
///
/// Mirrors the JSON configuration file:
///
/// ```json
/// {
///   "sourceDb": { "type": "postgresql", "host": "localhost", "port": 5432, ... },
///   "targetDb": { "type": "oracle", "host": "localhost", "port": 1521, ... },
///   "tables": ["users", "projects"],
///   "excludeColumns": ["updated_at"],
///   "maxSampleSize": 1000,
///   "batchSize": 100
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonConfig {
    /// Migration source
    pub source_db: DatabaseConfig,
    /// Migration target
    pub target_db: DatabaseConfig,
    /// Tables to compare, in order
    pub tables: Vec<String>,
    /// Columns ignored by the content comparison
    #[serde(default)]
    pub exclude_columns: Vec<String>,
    /// Keep catalog tables such as `pg_*` or `SYS_*` in the table list
    #[serde(default)]
    pub include_system_tables: bool,
    /// Rows fetched per side and table for the content comparison
    #[serde(default = "default_max_sample_size")]
    pub max_sample_size: usize,
    /// Rows compared between progress log lines
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Record per-table failures and keep going instead of aborting
    #[serde(default)]
    pub continue_on_error: bool,
    /// Row pairing used by the content comparison
    #[serde(default)]
    pub content_strategy: ContentStrategy,
    /// Cap on recorded field differences per table
    #[serde(default = "default_max_field_differences")]
    pub max_field_differences: usize,
}

impl ComparisonConfig {
    /// Creates a config with default tuning.
    pub fn new(source_db: DatabaseConfig, target_db: DatabaseConfig, tables: Vec<String>) -> Self {
        Self {
            source_db,
            target_db,
            tables,
            exclude_columns: Vec::new(),
            include_system_tables: false,
            max_sample_size: default_max_sample_size(),
            batch_size: default_batch_size(),
            continue_on_error: false,
            content_strategy: ContentStrategy::default(),
            max_field_differences: default_max_field_differences(),
        }
    }

    /// Builder method to replace the table list.
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set excluded columns.
    pub fn with_exclude_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the content sample size.
    pub fn with_max_sample_size(mut self, size: usize) -> Self {
        self.max_sample_size = size;
        self
    }

    /// Builder method to set the progress batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Builder method to enable per-table error resilience.
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Builder method to choose the content row pairing.
    pub fn with_content_strategy(mut self, strategy: ContentStrategy) -> Self {
        self.content_strategy = strategy;
        self
    }

    /// Builder method to include catalog tables.
    pub fn with_system_tables(mut self, include: bool) -> Self {
        self.include_system_tables = include;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if either side is invalid or tuning values are out of range
    pub fn validate(&self) -> crate::Result<()> {
        self.source_db.validate().map_err(|e| {
            CompareError::configuration(format!("sourceDb: {}", e))
        })?;
        self.target_db.validate().map_err(|e| {
            CompareError::configuration(format!("targetDb: {}", e))
        })?;

        if self.tables.is_empty() {
            return Err(CompareError::configuration("tables cannot be empty"));
        }

        if let Some(blank) = self.tables.iter().find(|t| t.trim().is_empty()) {
            return Err(CompareError::configuration(format!(
                "table names cannot be blank: {:?}",
                blank
            )));
        }

        if self.max_sample_size == 0 {
            return Err(CompareError::configuration(
                "maxSampleSize must be greater than 0",
            ));
        }

        if self.max_sample_size > MAX_SAMPLE_SIZE_LIMIT {
            return Err(CompareError::configuration(format!(
                "maxSampleSize should not exceed {}",
                MAX_SAMPLE_SIZE_LIMIT
            )));
        }

        if self.batch_size == 0 {
            return Err(CompareError::configuration("batchSize must be greater than 0"));
        }

        Ok(())
    }

    /// Tables to compare after system table filtering.
    pub fn effective_tables(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| self.include_system_tables || !is_system_table(t))
            .cloned()
            .collect()
    }

    /// Parses and validates a configuration from JSON text.
    ///
    /// # Errors
    /// Returns a serialization error for malformed JSON and a configuration
    /// error when validation fails
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CompareError::Serialization {
                context: "comparison configuration".to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CompareError::Io {
                context: format!("reading configuration {}", path.display()),
                source: e,
            })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Self::from_json(&contents)
    }

    /// Default configuration written by `init`.
    pub fn skeleton() -> Self {
        let source = DatabaseConfig::new(DatabaseType::PostgreSQL, "localhost", 5432, "pcm")
            .with_credentials("postgres", "")
            .with_schema("public");
        let target = DatabaseConfig::new(DatabaseType::Oracle, "localhost", 1521, "XEPDB1")
            .with_credentials("pcm", "");

        Self::new(source, target, Vec::new())
            .with_tables(["users", "projects", "vendors", "photos"])
            .with_exclude_columns(["created_at", "updated_at"])
    }

    /// Writes the skeleton configuration as pretty JSON.
    ///
    /// Passwords are never serialized, so the written file has none; users
    /// add `"password"` entries by hand.
    pub async fn write_skeleton(path: impl AsRef<Path>) -> crate::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&Self::skeleton()).map_err(|e| {
            CompareError::Serialization {
                context: "configuration skeleton".to_string(),
                source: e,
            }
        })?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| CompareError::Io {
                context: format!("writing configuration {}", path.display()),
                source: e,
            })?;
        tracing::info!("Wrote configuration skeleton to {}", path.display());
        Ok(())
    }
}

fn is_system_table(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let bare = lower.rsplit('.').next().unwrap_or(&lower);
    lower.starts_with("information_schema.")
        || bare.starts_with("pg_")
        || bare.starts_with("sys_")
        || bare.starts_with("bin$")
        || lower.starts_with("sys.")
}
