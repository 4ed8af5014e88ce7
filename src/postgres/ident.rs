//! Identifier quoting for DDL statements.
//!
//! PostgreSQL cannot bind identifiers as statement parameters, so names are
//! spliced into the statement text. Quote characters are doubled before the
//! value is wrapped in double quotes, and values carrying a statement
//! terminator are refused outright.

use crate::{Error, Result};

/// Doubles every single and double quote in `value`.
pub fn escape(value: &str) -> String {
    value.replace('\'', "''").replace('"', "\"\"")
}

/// Escapes `value` and wraps it in double quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

/// Rejects values that could terminate the surrounding statement.
pub fn check(kind: &str, value: &str) -> Result<()> {
    if value.contains(';') {
        return Err(Error::Validation(format!(
            "{} {:?} must not contain ';'",
            kind, value
        )));
    }
    Ok(())
}
