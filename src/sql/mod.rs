//! SQL statement construction.
//!
//! # Trust boundary
//!
//! Caller-supplied *values* only ever reach the database through `$n`
//! placeholders. Caller-supplied *identifiers* (table names, column names,
//! column types) are written into the statement text as-is, because
//! PostgreSQL has no parameter slot for identifiers. Under
//! [`IdentifierPolicy::Trusted`] the caller of the gateway must therefore be
//! trusted to send well-formed identifiers. [`IdentifierPolicy::Strict`]
//! restricts table and column names to plain identifiers before any SQL is
//! built.

pub mod builder;
pub mod encoder;
pub mod guard;

use crate::error::{DbError, DbResult};
use crate::models::SqlValue;
use std::fmt;

/// SQL text with positional placeholders plus the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub text: String,
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    /// A statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(text: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            params,
        }
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// How table and column names are checked before being written into SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Identifiers are interpolated verbatim.
    #[default]
    Trusted,
    /// Identifiers must be `name` or `schema.name` made of plain identifier parts.
    Strict,
}

impl IdentifierPolicy {
    pub fn from_strict_flag(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Trusted }
    }

    /// Check a table or column name against this policy.
    ///
    /// `role` names the argument in the error message, e.g. "table name".
    pub fn check(self, role: &str, name: &str) -> DbResult<()> {
        match self {
            Self::Trusted => Ok(()),
            Self::Strict => {
                if is_plain_identifier(name) {
                    Ok(())
                } else {
                    Err(DbError::invalid_input(format!(
                        "{role} '{name}' is not a plain SQL identifier \
                         (letters, digits, '_' and '$', optionally schema-qualified)"
                    )))
                }
            }
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_$]*`, optionally as `schema.name`.
fn is_plain_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            }
            _ => false,
        }
    })
}
