//! Schema catalog reader.
//!
//! Lists tables and their columns from `information_schema` for one schema.
//! Both queries run on a caller-held connection so the dispatcher controls
//! acquisition and release.

use crate::db::pool::ConnectionGuard;
use crate::db::types::JsonRow;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnInfo, SqlValue};
use tracing::debug;

mod queries {
    /// Engine order, deliberately unsorted.
    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema::text = $1
    "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT column_name::text AS column_name, data_type::text AS data_type
        FROM information_schema.columns
        WHERE table_schema::text = $1 AND table_name::text = $2
        ORDER BY ordinal_position
    "#;
}

/// Reads table metadata for a single schema.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schema: String,
}

impl SchemaCatalog {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// All table names in the schema.
    pub async fn list_tables(&self, conn: &mut ConnectionGuard) -> DbResult<Vec<String>> {
        let rows = conn
            .execute_raw(queries::LIST_TABLES, &[SqlValue::from(self.schema.as_str())])
            .await?;
        debug!(schema = %self.schema, count = rows.len(), "Listed tables");
        rows.iter()
            .map(|row| text_field(row, "table_name"))
            .collect()
    }

    /// Column name/type pairs of `table`, in ordinal order.
    ///
    /// A table that does not exist has no columns; this is not an error.
    pub async fn list_columns(
        &self,
        conn: &mut ConnectionGuard,
        table: &str,
    ) -> DbResult<Vec<ColumnInfo>> {
        let rows = conn
            .execute_raw(
                queries::LIST_COLUMNS,
                &[SqlValue::from(self.schema.as_str()), SqlValue::from(table)],
            )
            .await?;
        debug!(schema = %self.schema, table = %table, count = rows.len(), "Listed columns");
        rows.iter()
            .map(|row| {
                Ok(ColumnInfo::new(
                    text_field(row, "column_name")?,
                    text_field(row, "data_type")?,
                ))
            })
            .collect()
    }
}

fn text_field(row: &JsonRow, column: &str) -> DbResult<String> {
    row.get(column)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| DbError::internal(format!("catalog row has no text column '{column}'")))
}
