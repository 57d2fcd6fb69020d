//! Model types for log tables.

use crate::{DatabaseError, DatabaseResult};

/// Maximum accepted length for a log table name.
const MAX_TABLE_NAME_LEN: usize = 64;

/// A validated log table name.
///
/// Only `[A-Za-z_][A-Za-z0-9_]*` is accepted and names starting with `sqlite_`
/// are reserved. SQL keywords are fine: queries always use [`LogTable::quoted`].
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LogTable(String);

impl LogTable {
    /// Validates and wraps a table name.
    pub fn new(name: impl Into<String>) -> DatabaseResult<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid_start
            || !valid_rest
            || name.len() > MAX_TABLE_NAME_LEN
            || name.to_ascii_lowercase().starts_with("sqlite_")
        {
            return Err(DatabaseError::InvalidTable(name));
        }
        Ok(Self(name))
    }

    /// Returns the table name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as a double-quoted SQL identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl std::fmt::Display for LogTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row as stored in a log table.
///
/// `data` is the raw JSON text; decoding happens outside the executor thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRow {
    pub seq: i64,
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert_eq!(LogTable::new("records").unwrap().as_str(), "records");
        assert!(LogTable::new("_private").is_ok());
        assert!(LogTable::new("readings_v2").is_ok());
    }

    #[test]
    fn rejects_injection_and_reserved_names() {
        for bad in [
            "",
            "1records",
            "records; DROP TABLE x",
            "records-v2",
            "rec\"ords",
            "sqlite_master",
            "SQLITE_sequence",
        ] {
            assert!(
                matches!(LogTable::new(bad), Err(DatabaseError::InvalidTable(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn keywords_are_valid_and_quoted() {
        let table = LogTable::new("order").unwrap();
        assert_eq!(table.as_str(), "order");
        assert_eq!(table.quoted(), "\"order\"");
        assert_eq!(table.to_string(), "order");
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(MAX_TABLE_NAME_LEN + 1);
        assert!(LogTable::new(name).is_err());
    }
}
