//! Tool argument types.
//!
//! Each tool's arguments deserialize into one of these structs; the derived
//! JSON Schema doubles as the tool's advertised `inputSchema`.

use crate::error::{DbError, DbResult};
use crate::models::ColumnDef;
use crate::sql::encoder::ValueMap;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Input for the query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryArgs {
    /// A single SQL statement. Runs in a read-only transaction that is always rolled back.
    pub sql: String,
}

/// Input for the create_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableArgs {
    /// Name of the table to create
    pub table_name: String,
    /// Column definitions in table order
    pub columns: Vec<ColumnDef>,
}

/// Input for the insert_entry tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertEntryArgs {
    pub table_name: String,
    /// Column name to value. Must not be empty.
    pub values: ValueMap,
}

/// Input for the update_entry tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryArgs {
    pub table_name: String,
    /// Column name to new value. Must not be empty.
    pub values: ValueMap,
    /// Column name to required current value, combined with AND. Must not be empty.
    pub conditions: ValueMap,
}

/// Input for the delete_entry tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntryArgs {
    pub table_name: String,
    /// Column name to required value, combined with AND. Must not be empty.
    pub conditions: ValueMap,
}

/// Input for the delete_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTableArgs {
    /// Name of the table to drop. Dropping a missing table succeeds.
    pub table_name: String,
}

/// Deserialize tool arguments, reporting shape errors as validation errors.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: &JsonObject) -> DbResult<T> {
    serde_json::from_value(JsonValue::Object(args.clone()))
        .map_err(|e| DbError::invalid_input(format!("Invalid arguments for '{tool}': {e}")))
}

/// JSON Schema of `T` as a JSON object.
pub fn input_schema<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(JsonValue::Object(mut map)) => {
            map.remove("$schema");
            map
        }
        _ => {
            let mut map = JsonObject::new();
            map.insert("type".into(), JsonValue::String("object".into()));
            map
        }
    }
}
