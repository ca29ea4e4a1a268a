//! Pre-flight checks for the `query` tool.
//!
//! The read-only sandbox in `tools::policy` is what keeps `query` from
//! persisting writes. This guard only rejects inputs the sandbox cannot
//! contain: several statements at once, and transaction control that would
//! end the sandbox transaction early.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) with the PostgreSQL dialect.
//! SQL the parser does not understand is passed through to the database.

use crate::error::{DbError, DbResult};
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// What the guard learned about a query it accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Parsed as exactly one statement of the given kind.
    Statement(&'static str),
    /// The parser could not handle the text; the database will decide.
    Unparsed,
}

mod error_messages {
    pub const EMPTY: &str = "'sql' must contain a statement";
    pub const MULTIPLE: &str =
        "'sql' must contain exactly one statement; multi-statement scripts are not supported";
    pub const TRANSACTION: &str =
        "Transaction control is not allowed in query; it already runs in a read-only transaction";
}

/// Validate SQL for the `query` tool.
pub fn check_query(sql: &str) -> DbResult<QueryShape> {
    if sql.trim().trim_matches(';').trim().is_empty() {
        return Err(DbError::invalid_input(error_messages::EMPTY));
    }

    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            tracing::debug!(error = %e, "query not parsed; passing through to the database");
            return Ok(QueryShape::Unparsed);
        }
    };

    match statements.as_slice() {
        [] => Err(DbError::invalid_input(error_messages::EMPTY)),
        [stmt] => {
            let kind = classify_statement(stmt);
            if is_transaction_control(stmt) {
                return Err(DbError::invalid_input(format!(
                    "{} ({})",
                    error_messages::TRANSACTION,
                    kind
                )));
            }
            Ok(QueryShape::Statement(kind))
        }
        _ => Err(DbError::invalid_input(error_messages::MULTIPLE)),
    }
}

fn is_transaction_control(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::StartTransaction { .. }
            | Statement::Commit { .. }
            | Statement::Rollback { .. }
            | Statement::Savepoint { .. }
            | Statement::ReleaseSavepoint { .. }
    )
}

/// Short name of a statement, used in logs and error messages.
fn classify_statement(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Query { .. } => "SELECT",
        Statement::Explain { .. } => "EXPLAIN",
        Statement::ShowVariable { .. } => "SHOW",
        Statement::Insert { .. } => "INSERT",
        Statement::Update { .. } => "UPDATE",
        Statement::Delete { .. } => "DELETE",
        Statement::Merge { .. } => "MERGE",
        Statement::Copy { .. } => "COPY",
        Statement::CreateTable { .. } => "CREATE TABLE",
        Statement::AlterTable { .. } => "ALTER TABLE",
        Statement::Drop { .. } => "DROP",
        Statement::Truncate { .. } => "TRUNCATE",
        Statement::StartTransaction { .. } => "BEGIN",
        Statement::Commit { .. } => "COMMIT",
        Statement::Rollback { .. } => "ROLLBACK",
        Statement::Savepoint { .. } => "SAVEPOINT",
        Statement::ReleaseSavepoint { .. } => "RELEASE SAVEPOINT",
        Statement::Set { .. } => "SET",
        _ => "OTHER",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_ok() {
        assert_eq!(
            check_query("SELECT * FROM users").unwrap(),
            QueryShape::Statement("SELECT")
        );
    }

    #[test]
    fn test_trailing_semicolon_ok() {
        assert!(check_query("SELECT 1;").is_ok());
    }

    #[test]
    fn test_writes_pass_the_guard() {
        // The read-only transaction rejects these at execution time.
        assert_eq!(
            check_query("INSERT INTO t1 (id) VALUES (1)").unwrap(),
            QueryShape::Statement("INSERT")
        );
    }

    #[test]
    fn test_empty_rejected() {
        for sql in ["", "   ", ";", " ; "] {
            assert!(matches!(check_query(sql), Err(DbError::InvalidInput { .. })), "{sql:?}");
        }
    }

    #[test]
    fn test_multiple_statements_rejected() {
        let err = check_query("SELECT 1; SELECT 2").unwrap_err();
        assert!(err.to_string().contains("exactly one statement"));
    }

    #[test]
    fn test_transaction_control_rejected() {
        for sql in ["COMMIT", "ROLLBACK", "BEGIN", "SAVEPOINT a", "RELEASE SAVEPOINT a"] {
            let err = check_query(sql).unwrap_err();
            assert!(err.to_string().contains("Transaction control"), "{sql}");
        }
    }

    #[test]
    fn test_complex_select_with_subquery() {
        let sql = r#"
            SELECT u.name, (SELECT COUNT(*) FROM orders WHERE user_id = u.id) as order_count
            FROM users u
            WHERE u.id IN (SELECT user_id FROM active_users)
        "#;
        assert!(check_query(sql).is_ok());
    }

    #[test]
    fn test_unparseable_sql_passes_through() {
        assert_eq!(
            check_query("SELEC * FROM t").unwrap(),
            QueryShape::Unparsed
        );
    }
}
