//! Identifier/value encoding.
//!
//! Turns column→value mappings into column lists, `$n` placeholders and
//! ordered parameter lists. Numbering starts after `offset` placeholders so
//! fragments can be combined in one statement without collisions.
//!
//! Column names are not quoted or escaped; see the trust boundary in [`crate::sql`].

use crate::models::SqlValue;
use indexmap::IndexMap;

/// Column→value mapping in caller order.
pub type ValueMap = IndexMap<String, SqlValue>;

/// Columns, placeholders and parameters for a `(cols) VALUES (...)` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedValues {
    pub columns: Vec<String>,
    pub placeholders: Vec<String>,
    pub params: Vec<SqlValue>,
}

/// A `col = $k` list with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedPairs {
    pub text: String,
    pub params: Vec<SqlValue>,
}

pub fn placeholder(index: usize) -> String {
    format!("${index}")
}

/// Encode `values` for an insert column list.
pub fn encode_values(values: &ValueMap, offset: usize) -> EncodedValues {
    let mut encoded = EncodedValues {
        columns: Vec::with_capacity(values.len()),
        placeholders: Vec::with_capacity(values.len()),
        params: Vec::with_capacity(values.len()),
    };
    for (i, (column, value)) in values.iter().enumerate() {
        encoded.columns.push(column.clone());
        encoded.placeholders.push(placeholder(offset + i + 1));
        encoded.params.push(value.clone());
    }
    encoded
}

/// Encode `values` as a `SET` list: `a = $1, b = $2`.
pub fn encode_assignments(values: &ValueMap, offset: usize) -> EncodedPairs {
    encode_pairs(values, offset, ", ")
}

/// Encode `conditions` as a `WHERE` conjunction: `a = $1 AND b = $2`.
pub fn encode_conditions(conditions: &ValueMap, offset: usize) -> EncodedPairs {
    encode_pairs(conditions, offset, " AND ")
}

fn encode_pairs(pairs: &ValueMap, offset: usize, separator: &str) -> EncodedPairs {
    let mut fragments = Vec::with_capacity(pairs.len());
    let mut params = Vec::with_capacity(pairs.len());
    for (i, (column, value)) in pairs.iter().enumerate() {
        fragments.push(format!("{} = {}", column, placeholder(offset + i + 1)));
        params.push(value.clone());
    }
    EncodedPairs {
        text: fragments.join(separator),
        params,
    }
}
