//! Result shaping for tool calls.

use crate::db::JsonRow;
use crate::error::{DbError, DbResult};
use crate::models::ColumnDef;
use serde::Serialize;

/// What a successful call reports back, chosen when the call is prepared.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The rows themselves.
    Rows,
    Created { table: String, columns: Vec<ColumnDef> },
    /// Only the first returned row is shown.
    Inserted { table: String },
    Updated { table: String },
    Deleted { table: String },
    Dropped { table: String },
}

impl Outcome {
    /// Render the success text for the rows a statement returned.
    pub fn render(&self, rows: &[JsonRow]) -> DbResult<String> {
        Ok(match self {
            Self::Rows => pretty(rows)?,
            Self::Created { table, columns } => format!(
                "Table \"{}\" created successfully with columns: {}",
                table,
                columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Inserted { table } => {
                format!("Inserted into table \"{}\": {}", table, pretty(&rows.first())?)
            }
            Self::Updated { table } => {
                format!("Updated entry in table \"{}\": {}", table, pretty(rows)?)
            }
            Self::Deleted { table } => {
                format!("Deleted entry from table \"{}\": {}", table, pretty(rows)?)
            }
            Self::Dropped { table } => format!("Table \"{}\" deleted successfully", table),
        })
    }
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DbError::internal(format!("Failed to serialize rows: {}", e)))
}
