//! Oracle connection tests that need neither a server nor Instant Client.

use dbcompare_core::adapters::create_connection;
use dbcompare_core::models::DatabaseType;
use dbcompare_core::DatabaseConfig;

fn config() -> DatabaseConfig {
    DatabaseConfig::new(DatabaseType::Oracle, "localhost", 1521, "XEPDB1")
        .with_credentials("pcm", "oracle-secret")
        .with_schema("pcm")
}

#[cfg(feature = "oracle")]
#[test]
fn test_oracle_connection_creation() {
    use dbcompare_core::SqlDialect;

    let conn = create_connection(&config()).unwrap();
    assert_eq!(conn.database_type(), DatabaseType::Oracle);
    assert_eq!(conn.dialect(), SqlDialect::Oracle);
    assert!(!conn.is_connected());
    assert!(!conn.safe_description().contains("oracle-secret"));
}

#[cfg(not(feature = "oracle"))]
#[test]
fn test_oracle_requires_feature() {
    let Err(err) = create_connection(&config()) else {
        panic!("expected an unsupported-feature error");
    };
    assert_eq!(err.code(), "UNSUPPORTED_FEATURE");
    assert!(err.to_string().contains("--features oracle"));
}
