//! Connection configuration for one database side.

use crate::error::{CompareError, redact_database_url};
use crate::models::DatabaseType;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use zeroize::Zeroizing;

/// Database password that is zeroed on drop and never printed.
#[derive(Clone, Default)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wraps a plaintext password.
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }

    /// Exposes the password for handing to a driver.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether a password was provided at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(****)")
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Password::new)
    }
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Connection parameters for one side of the comparison.
///
/// For Oracle, `database` is the service name used in the EZConnect string.
///
/// # Example
/// ```rust
/// use dbcompare_core::config::DatabaseConfig;
/// use dbcompare_core::models::DatabaseType;
///
/// let config = DatabaseConfig::new(DatabaseType::PostgreSQL, "localhost", 5432, "pcm")
///     .with_credentials("postgres", "secret")
///     .with_schema("public");
///
/// assert!(config.validate().is_ok());
/// assert!(!config.to_string().contains("secret"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Backend kind (`postgresql` or `oracle`)
    #[serde(rename = "type")]
    pub database_type: DatabaseType,
    /// Database host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Database name, or service name for Oracle
    pub database: String,
    /// Login user
    pub username: String,
    /// Login password (never serialized)
    #[serde(default, skip_serializing)]
    pub password: Password,
    /// Schema or owner to read tables from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl std::fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}:{}/{})",
            self.database_type, self.host, self.port, self.database
        )
        // Intentionally omit username and never include credentials
    }
}

impl DatabaseConfig {
    /// Creates a config without credentials.
    pub fn new(
        database_type: DatabaseType,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        Self {
            database_type,
            host: host.into(),
            port,
            database: database.into(),
            username: String::new(),
            password: Password::default(),
            schema: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    /// Builder method to set username and password.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = Password::new(password);
        self
    }

    /// Builder method to set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method to set the connection timeout.
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Connection timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are missing or invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(CompareError::configuration("host cannot be empty"));
        }

        if self.port == 0 {
            return Err(CompareError::configuration("port must be greater than 0"));
        }

        if self.database.trim().is_empty() {
            return Err(CompareError::configuration("database cannot be empty"));
        }

        if self.username.trim().is_empty() {
            return Err(CompareError::configuration("username cannot be empty"));
        }

        if self.connect_timeout_secs == 0 {
            return Err(CompareError::configuration(
                "connect_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Builds a connection URL including credentials.
    ///
    /// The result contains the password and must never be logged; use
    /// [`DatabaseConfig::safe_description`] or [`DatabaseConfig::redacted_url`].
    ///
    /// # Errors
    /// Returns a configuration error when the host cannot form a valid URL
    pub fn connection_url(&self) -> crate::Result<String> {
        let scheme = match self.database_type {
            DatabaseType::PostgreSQL => "postgres",
            DatabaseType::Oracle => "oracle",
        };

        let mut url = url::Url::parse(&format!(
            "{}://{}:{}/{}",
            scheme, self.host, self.port, self.database
        ))
        .map_err(|e| CompareError::configuration(format!("invalid connection target: {}", e)))?;

        if !self.username.is_empty() {
            url.set_username(&self.username)
                .map_err(|_| CompareError::configuration("username cannot be set on URL"))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(self.password.expose()))
                .map_err(|_| CompareError::configuration("password cannot be set on URL"))?;
        }

        Ok(url.to_string())
    }

    /// Connection URL with the password masked, safe to log.
    pub fn redacted_url(&self) -> String {
        match self.connection_url() {
            Ok(url) => redact_database_url(&url),
            Err(_) => "<redacted>".to_string(),
        }
    }

    /// EZConnect string (`host:port/service`) used by the Oracle client.
    pub fn connect_string(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }

    /// Credential-free description for logs and error messages.
    pub fn safe_description(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{} {}:{}/{} (schema {})",
                self.database_type, self.host, self.port, self.database, schema
            ),
            None => format!(
                "{} {}:{}/{}",
                self.database_type, self.host, self.port, self.database
            ),
        }
    }
}
