//! Identifier whitelisting.
//!
//! Table, schema, and column names end up interpolated directly into
//! generated SQL because PostgreSQL has no way to bind an identifier as a
//! query parameter. Every name that reaches a query builder in this crate
//! must first pass through [`validate_identifier`], which accepts only the
//! shape PostgreSQL itself allows for an unquoted identifier.

use std::sync::OnceLock;

use regex::Regex;

use pgarchive_core::error::{Error, Result};

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// Validate that `name` is safe to interpolate as a bare SQL identifier.
pub fn validate_identifier(name: &str) -> Result<&str> {
    if identifier_pattern().is_match(name) {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// Validate a whole slice of identifiers, e.g. a column list.
pub fn validate_identifiers<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for name in names {
        validate_identifier(name)?;
    }
    Ok(())
}

/// `schema.table`, with both parts validated and quoted with double quotes.
pub fn qualify(schema: &str, table: &str) -> Result<String> {
    validate_identifier(schema)?;
    validate_identifier(table)?;
    Ok(format!("\"{schema}\".\"{table}\""))
}

/// Quote a single identifier with double quotes after validating it.
pub fn quote(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_identifier("book").is_ok());
        assert!(validate_identifier("author_book").is_ok());
        assert!(validate_identifier("_private").is_ok());
    }

    #[test]
    fn rejects_sql_injection_attempts() {
        assert!(validate_identifier("book; DROP TABLE author;").is_err());
        assert!(validate_identifier("book\"").is_err());
        assert!(validate_identifier("book table").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn rejects_leading_digit() {
        assert!(validate_identifier("1table").is_err());
    }

    #[test]
    fn qualify_quotes_both_parts() {
        assert_eq!(qualify("public", "book").unwrap(), "\"public\".\"book\"");
    }

    #[test]
    fn qualify_rejects_invalid_schema() {
        assert!(qualify("pub;lic", "book").is_err());
    }
}
