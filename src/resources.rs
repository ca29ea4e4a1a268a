//! Table schema resources.
//!
//! Every table is browsable at `<base>/<table>/schema`, where `<base>` is the
//! connection URL without its password. The table segment replaces the
//! database name and is percent-encoded.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnInfo, ResourceContent, ResourceDescriptor, SCHEMA_MIME_TYPE};
use url::Url;

/// Fixed trailing path segment of every schema resource.
pub const SCHEMA_PATH: &str = "schema";

/// Describe the schema resource of `table`.
pub fn descriptor(base: &Url, table: &str) -> DbResult<ResourceDescriptor> {
    let mut uri = base.clone();
    uri.path_segments_mut()
        .map_err(|_| DbError::internal(format!("Cannot build resource URI for '{table}'")))?
        .pop_if_empty()
        .pop()
        .push(table)
        .push(SCHEMA_PATH);
    Ok(ResourceDescriptor {
        uri: uri.to_string(),
        mime_type: SCHEMA_MIME_TYPE.to_string(),
        name: format!("\"{}\" database schema", table),
        description: format!("Column names and data types of table \"{}\"", table),
    })
}

/// Extract the table name from a schema resource URI.
///
/// The last path segment must be the schema literal; the one before it is
/// the percent-encoded table. Anything else is an invalid resource.
pub fn parse_table(uri: &str) -> DbResult<String> {
    let url = Url::parse(uri).map_err(|e| DbError::invalid_resource(uri, e.to_string()))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [.., table, suffix] if *suffix == SCHEMA_PATH && !table.is_empty() => {
            urlencoding::decode(table)
                .map(|decoded| decoded.into_owned())
                .map_err(|_| DbError::invalid_resource(uri, "table name is not valid UTF-8"))
        }
        [.., suffix] if *suffix == SCHEMA_PATH => {
            Err(DbError::invalid_resource(uri, "missing table name"))
        }
        _ => Err(DbError::invalid_resource(
            uri,
            format!("path must end in '<table>/{}'", SCHEMA_PATH),
        )),
    }
}

/// Resource body for a table's columns.
pub fn content(uri: &str, columns: &[ColumnInfo]) -> DbResult<ResourceContent> {
    let text = serde_json::to_string_pretty(columns)
        .map_err(|e| DbError::internal(format!("Failed to serialize columns: {}", e)))?;
    Ok(ResourceContent {
        uri: uri.to_string(),
        mime_type: SCHEMA_MIME_TYPE.to_string(),
        text,
    })
}
