//! Name validation for types, tables and columns

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{NameKind, Result, SchemaError};

fn relation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static regex"))
}

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

/// Strip an optional leading `@` from a type name.
///
/// Callers may write either `file` or `@file`; the registry stores the bare form.
pub fn bare_type_name(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

/// Validate a type name and return its bare form
pub fn type_name(name: &str) -> Result<String> {
    let bare = bare_type_name(name);
    if relation_pattern().is_match(bare) {
        Ok(bare.to_string())
    } else {
        Err(SchemaError::InvalidName {
            kind: NameKind::Type,
            name: name.to_string(),
        })
    }
}

/// Validate a table name (lower-case with underscores)
pub fn table_name(name: &str) -> Result<String> {
    if relation_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(SchemaError::InvalidName {
            kind: NameKind::Table,
            name: name.to_string(),
        })
    }
}

/// Validate a column name (identifiers may be camelCase)
pub fn column_name(name: &str) -> Result<String> {
    if column_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(SchemaError::InvalidName {
            kind: NameKind::Column,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name("@location_default").unwrap(), "location_default");
        assert_eq!(type_name("file").unwrap(), "file");
        assert!(type_name("File").is_err());
        assert!(type_name("").is_err());
        assert!(type_name("@").is_err());
        assert!(type_name("expr.kind").is_err());
    }

    #[test]
    fn test_column_names_allow_camel_case() {
        assert!(column_name("beginLine").is_ok());
        assert!(column_name("num_lines").is_ok());
        assert!(column_name("1st").is_err());
        assert!(column_name("has space").is_err());
    }

    #[test]
    fn test_table_names_are_lower_case() {
        assert!(table_name("locations_default").is_ok());
        assert!(table_name("Files").is_err());
    }
}
