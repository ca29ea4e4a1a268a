//! The static tool set.
//!
//! A lookup table from tool name to its descriptor and a `prepare` function.
//! Preparing validates the arguments and builds the statement, its execution
//! policy and how to report success. Nothing here touches a connection.

use super::input::{
    CreateTableArgs, DeleteEntryArgs, DeleteTableArgs, InsertEntryArgs, JsonObject, QueryArgs,
    UpdateEntryArgs, input_schema, parse_args,
};
use super::outcome::Outcome;
use super::policy::ExecutionPolicy;
use crate::error::{DbError, DbResult};
use crate::models::ToolDescriptor;
use crate::sql::guard::{QueryShape, check_query};
use crate::sql::{IdentifierPolicy, SqlStatement, builder};
use std::collections::HashMap;
use tracing::debug;

/// A validated call, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub statement: SqlStatement,
    pub policy: ExecutionPolicy,
    pub outcome: Outcome,
}

type PrepareFn = fn(&JsonObject, IdentifierPolicy) -> DbResult<PreparedCall>;

struct ToolEntry {
    descriptor: ToolDescriptor,
    prepare: PrepareFn,
}

/// Immutable set of tools, built once at startup.
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<&'static str, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        let entries = vec![
            entry(
                "query",
                "Run a read-only SQL query",
                input_schema::<QueryArgs>(),
                prepare_query,
            ),
            entry(
                "create_table",
                "Create a new table in the database",
                input_schema::<CreateTableArgs>(),
                prepare_create_table,
            ),
            entry(
                "insert_entry",
                "Insert a new entry into a table",
                input_schema::<InsertEntryArgs>(),
                prepare_insert_entry,
            ),
            entry(
                "delete_table",
                "Delete a table from the database",
                input_schema::<DeleteTableArgs>(),
                prepare_delete_table,
            ),
            entry(
                "update_entry",
                "Update an entry in a table",
                input_schema::<UpdateEntryArgs>(),
                prepare_update_entry,
            ),
            entry(
                "delete_entry",
                "Delete an entry from a table",
                input_schema::<DeleteEntryArgs>(),
                prepare_delete_entry,
            ),
        ];
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.descriptor.name, i))
            .collect();
        Self { entries, index }
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.descriptor.name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Validate `args` for tool `name` and build its statement.
    pub fn prepare(
        &self,
        name: &str,
        args: &JsonObject,
        identifiers: IdentifierPolicy,
    ) -> DbResult<PreparedCall> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| DbError::unknown_tool(name))?;
        (entry.prepare)(args, identifiers)
    }
}

fn entry(
    name: &'static str,
    description: &'static str,
    input_schema: JsonObject,
    prepare: PrepareFn,
) -> ToolEntry {
    ToolEntry {
        descriptor: ToolDescriptor {
            name,
            description,
            input_schema,
        },
        prepare,
    }
}

fn check_columns<'a>(
    identifiers: IdentifierPolicy,
    columns: impl IntoIterator<Item = &'a String>,
) -> DbResult<()> {
    columns
        .into_iter()
        .try_for_each(|c| identifiers.check("column name", c))
}

fn prepare_query(args: &JsonObject, _: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: QueryArgs = parse_args("query", args)?;
    if let QueryShape::Statement(kind) = check_query(&args.sql)? {
        debug!(kind, "query accepted");
    }
    Ok(PreparedCall {
        statement: builder::query(&args.sql),
        policy: ExecutionPolicy::ReadOnlySandbox,
        outcome: Outcome::Rows,
    })
}

fn prepare_create_table(args: &JsonObject, identifiers: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: CreateTableArgs = parse_args("create_table", args)?;
    identifiers.check("table name", &args.table_name)?;
    check_columns(identifiers, args.columns.iter().map(|c| &c.name))?;
    Ok(PreparedCall {
        statement: builder::create_table(&args.table_name, &args.columns)?,
        policy: ExecutionPolicy::Autocommit,
        outcome: Outcome::Created {
            table: args.table_name,
            columns: args.columns,
        },
    })
}

fn prepare_insert_entry(args: &JsonObject, identifiers: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: InsertEntryArgs = parse_args("insert_entry", args)?;
    identifiers.check("table name", &args.table_name)?;
    check_columns(identifiers, args.values.keys())?;
    Ok(PreparedCall {
        statement: builder::insert_entry(&args.table_name, &args.values)?,
        policy: ExecutionPolicy::Autocommit,
        outcome: Outcome::Inserted {
            table: args.table_name,
        },
    })
}

fn prepare_update_entry(args: &JsonObject, identifiers: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: UpdateEntryArgs = parse_args("update_entry", args)?;
    identifiers.check("table name", &args.table_name)?;
    check_columns(identifiers, args.values.keys().chain(args.conditions.keys()))?;
    Ok(PreparedCall {
        statement: builder::update_entry(&args.table_name, &args.values, &args.conditions)?,
        policy: ExecutionPolicy::Autocommit,
        outcome: Outcome::Updated {
            table: args.table_name,
        },
    })
}

fn prepare_delete_entry(args: &JsonObject, identifiers: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: DeleteEntryArgs = parse_args("delete_entry", args)?;
    identifiers.check("table name", &args.table_name)?;
    check_columns(identifiers, args.conditions.keys())?;
    Ok(PreparedCall {
        statement: builder::delete_entry(&args.table_name, &args.conditions)?,
        policy: ExecutionPolicy::Autocommit,
        outcome: Outcome::Deleted {
            table: args.table_name,
        },
    })
}

fn prepare_delete_table(args: &JsonObject, identifiers: IdentifierPolicy) -> DbResult<PreparedCall> {
    let args: DeleteTableArgs = parse_args("delete_table", args)?;
    identifiers.check("table name", &args.table_name)?;
    Ok(PreparedCall {
        statement: builder::delete_table(&args.table_name)?,
        policy: ExecutionPolicy::Autocommit,
        outcome: Outcome::Dropped {
            table: args.table_name,
        },
    })
}
