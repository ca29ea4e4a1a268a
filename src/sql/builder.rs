//! Statement builders, one per tool.
//!
//! Each builder is a pure function from validated arguments to a
//! [`SqlStatement`]. Arguments that would produce syntactically invalid SQL
//! (blank table names, empty column or value lists) are rejected here so they
//! never reach the database.

use super::SqlStatement;
use super::encoder::{ValueMap, encode_assignments, encode_conditions, encode_values};
use crate::error::{DbError, DbResult};
use crate::models::ColumnDef;

/// `query`: the caller's SQL, untouched and without parameters.
pub fn query(sql: &str) -> SqlStatement {
    SqlStatement::new(sql)
}

/// `CREATE TABLE <name> (<col> <type>, ...)`
pub fn create_table(table: &str, columns: &[ColumnDef]) -> DbResult<SqlStatement> {
    require_table(table)?;
    if columns.is_empty() {
        return Err(DbError::invalid_input("'columns' must not be empty"));
    }
    let mut defs = Vec::with_capacity(columns.len());
    for column in columns {
        if column.name.trim().is_empty() || column.data_type.trim().is_empty() {
            return Err(DbError::invalid_input(
                "every column needs a non-empty 'name' and 'type'",
            ));
        }
        defs.push(format!("{} {}", column.name, column.data_type));
    }
    Ok(SqlStatement::new(format!(
        "CREATE TABLE {} ({})",
        table,
        defs.join(", ")
    )))
}

/// `INSERT INTO <name> (<cols>) VALUES (<placeholders>) RETURNING *`
pub fn insert_entry(table: &str, values: &ValueMap) -> DbResult<SqlStatement> {
    require_table(table)?;
    require_non_empty("values", values)?;
    let encoded = encode_values(values, 0);
    Ok(SqlStatement::with_params(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table,
            encoded.columns.join(", "),
            encoded.placeholders.join(", ")
        ),
        encoded.params,
    ))
}

/// `UPDATE <name> SET <col = $k, ...> WHERE <cond = $k AND ...> RETURNING *`
///
/// Value placeholders come first; condition placeholders continue the sequence.
pub fn update_entry(
    table: &str,
    values: &ValueMap,
    conditions: &ValueMap,
) -> DbResult<SqlStatement> {
    require_table(table)?;
    require_non_empty("values", values)?;
    require_non_empty("conditions", conditions)?;
    let set = encode_assignments(values, 0);
    let filter = encode_conditions(conditions, set.params.len());
    let mut params = set.params;
    params.extend(filter.params);
    Ok(SqlStatement::with_params(
        format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            table, set.text, filter.text
        ),
        params,
    ))
}

/// `DELETE FROM <name> WHERE <cond = $k AND ...> RETURNING *`
pub fn delete_entry(table: &str, conditions: &ValueMap) -> DbResult<SqlStatement> {
    require_table(table)?;
    require_non_empty("conditions", conditions)?;
    let filter = encode_conditions(conditions, 0);
    Ok(SqlStatement::with_params(
        format!("DELETE FROM {} WHERE {} RETURNING *", table, filter.text),
        filter.params,
    ))
}

/// `DROP TABLE IF EXISTS <name>`
pub fn delete_table(table: &str) -> DbResult<SqlStatement> {
    require_table(table)?;
    Ok(SqlStatement::new(format!("DROP TABLE IF EXISTS {}", table)))
}

fn require_table(table: &str) -> DbResult<()> {
    if table.trim().is_empty() {
        return Err(DbError::invalid_input("'tableName' must not be empty"));
    }
    Ok(())
}

fn require_non_empty(field: &str, map: &ValueMap) -> DbResult<()> {
    if map.is_empty() {
        return Err(DbError::invalid_input(format!(
            "'{field}' must contain at least one column"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SqlValue;

    fn map(pairs: &[(&str, &str)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), SqlValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_query_is_verbatim() {
        let stmt = query("SELECT * FROM t1 WHERE a = 'x'");
        assert_eq!(stmt.text, "SELECT * FROM t1 WHERE a = 'x'");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_create_table() {
        let stmt = create_table(
            "t1",
            &[ColumnDef::new("id", "INTEGER"), ColumnDef::new("name", "TEXT")],
        )
        .unwrap();
        assert_eq!(stmt.text, "CREATE TABLE t1 (id INTEGER, name TEXT)");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_create_table_requires_columns() {
        assert!(create_table("t1", &[]).is_err());
        assert!(create_table("t1", &[ColumnDef::new("id", " ")]).is_err());
    }

    #[test]
    fn test_insert_entry() {
        let stmt = insert_entry("t1", &map(&[("id", "5")])).unwrap();
        assert_eq!(stmt.text, "INSERT INTO t1 (id) VALUES ($1) RETURNING *");
        assert_eq!(stmt.params, vec![SqlValue::from("5")]);
    }

    #[test]
    fn test_insert_entry_multiple_columns() {
        let stmt = insert_entry("t1", &map(&[("id", "5"), ("name", "bob")])).unwrap();
        assert_eq!(
            stmt.text,
            "INSERT INTO t1 (id, name) VALUES ($1, $2) RETURNING *"
        );
    }

    #[test]
    fn test_update_entry_numbers_conditions_after_values() {
        let stmt = update_entry("t1", &map(&[("id", "9")]), &map(&[("id", "5")])).unwrap();
        assert_eq!(stmt.text, "UPDATE t1 SET id = $1 WHERE id = $2 RETURNING *");
        assert_eq!(stmt.params, vec![SqlValue::from("9"), SqlValue::from("5")]);
    }

    #[test]
    fn test_delete_entry() {
        let stmt = delete_entry("t1", &map(&[("id", "5"), ("name", "x")])).unwrap();
        assert_eq!(
            stmt.text,
            "DELETE FROM t1 WHERE id = $1 AND name = $2 RETURNING *"
        );
    }

    #[test]
    fn test_delete_table() {
        assert_eq!(delete_table("t1").unwrap().text, "DROP TABLE IF EXISTS t1");
    }

    #[test]
    fn test_empty_mappings_rejected() {
        let empty = ValueMap::new();
        let one = map(&[("id", "1")]);
        for result in [
            insert_entry("t1", &empty),
            update_entry("t1", &empty, &one),
            update_entry("t1", &one, &empty),
            delete_entry("t1", &empty),
        ] {
            assert!(matches!(result, Err(DbError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_blank_table_rejected() {
        assert!(delete_table("  ").is_err());
        assert!(insert_entry("", &map(&[("id", "1")])).is_err());
    }
}
