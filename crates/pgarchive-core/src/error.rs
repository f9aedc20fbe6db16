//! Error types for the archival engine.

use thiserror::Error;

/// Result type alias using the archival engine's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for archival engine operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file or mapping was missing a field, had the wrong
    /// type, or contained an unparseable bool/int.
    #[error("Configuration error: {0}")]
    ConfigInvalid(String),

    /// The configured schema does not exist, or the catalog query failed.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A Query API operation was called with a table absent from the graph.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Archival was requested on a table with no primary key recorded in
    /// the graph.
    #[error("No primary key recorded for table: {0}")]
    NoPrimaryKey(String),

    /// A schema, table, or column name failed the identifier whitelist
    /// before being interpolated into generated SQL.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Database operation failed (wraps `sqlx::Error`).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O failure (reading config files, writing log files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config_invalid() {
        let err = Error::ConfigInvalid("missing host".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing host");
    }

    #[test]
    fn test_error_display_catalog_unavailable() {
        let err = Error::CatalogUnavailable("schema not found".to_string());
        assert_eq!(err.to_string(), "Catalog unavailable: schema not found");
    }

    #[test]
    fn test_error_display_unknown_table() {
        let err = Error::UnknownTable("ghost".to_string());
        assert_eq!(err.to_string(), "Unknown table: ghost");
    }

    #[test]
    fn test_error_display_no_primary_key() {
        let err = Error::NoPrimaryKey("book".to_string());
        assert_eq!(err.to_string(), "No primary key recorded for table: book");
    }

    #[test]
    fn test_error_display_invalid_identifier() {
        let err = Error::InvalidIdentifier("drop table;".to_string());
        assert_eq!(err.to_string(), "Invalid identifier: drop table;");
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::UnknownTable("x".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("UnknownTable"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing config.ini");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
