//! Transaction policy enforcer.
//!
//! `query` runs inside `BEGIN TRANSACTION READ ONLY` and is always rolled
//! back, success or not. Every other tool runs its statement directly in
//! autocommit mode.

use crate::db::{ConnectionGuard, JsonRow};
use crate::error::DbResult;
use crate::sql::SqlStatement;
use tracing::warn;

pub const BEGIN_READ_ONLY: &str = "BEGIN TRANSACTION READ ONLY";
pub const ROLLBACK: &str = "ROLLBACK";

/// How a tool's statement is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Read-only transaction, unconditionally rolled back.
    ReadOnlySandbox,
    /// No explicit transaction; effects are visible immediately.
    Autocommit,
}

impl ExecutionPolicy {
    /// Run `statement` on `conn` under this policy.
    pub async fn run(
        self,
        conn: &mut ConnectionGuard,
        statement: &SqlStatement,
    ) -> DbResult<Vec<JsonRow>> {
        match self {
            Self::Autocommit => conn.execute(statement).await,
            Self::ReadOnlySandbox => run_sandboxed(conn, statement).await,
        }
    }
}

async fn run_sandboxed(
    conn: &mut ConnectionGuard,
    statement: &SqlStatement,
) -> DbResult<Vec<JsonRow>> {
    conn.execute_raw(BEGIN_READ_ONLY, &[]).await?;
    let result = conn.execute(statement).await;
    let rollback = conn.execute_raw(ROLLBACK, &[]).await;

    match (result, rollback) {
        (Ok(rows), Ok(_)) => Ok(rows),
        (Ok(_), Err(rollback_err)) => Err(rollback_err),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(rollback_err)) => {
            warn!(
                error = %rollback_err,
                "Rollback failed after query error; reporting the query error"
            );
            Err(err)
        }
    }
}
