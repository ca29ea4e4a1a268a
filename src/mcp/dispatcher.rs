//! Request dispatcher.
//!
//! Serves the four requests of the gateway independently of any transport:
//! list/read resources, list tools, call a tool. Each request that touches
//! the database holds exactly one connection, acquired after validation and
//! released on every exit path.

use crate::db::{ConnectionGuard, ConnectionSource, SchemaCatalog};
use crate::error::{DbError, DbResult};
use crate::models::{ResourceContent, ResourceDescriptor, ToolDescriptor, ToolResponse};
use crate::resources;
use crate::sql::IdentifierPolicy;
use crate::tools::{JsonObject, PreparedCall, ToolRegistry};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct GatewayContext {
    pub pool: Arc<dyn ConnectionSource>,
    /// Base URL resource URIs are resolved against (no password).
    pub resource_base: Url,
    pub catalog: SchemaCatalog,
    pub identifiers: IdentifierPolicy,
}

impl std::fmt::Debug for GatewayContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayContext")
            .field("resource_base", &self.resource_base.as_str())
            .field("schema", &self.catalog.schema())
            .field("identifiers", &self.identifiers)
            .finish_non_exhaustive()
    }
}

impl GatewayContext {
    pub fn new(
        pool: Arc<dyn ConnectionSource>,
        resource_base: Url,
        schema: impl Into<String>,
        identifiers: IdentifierPolicy,
    ) -> Self {
        Self {
            pool,
            resource_base,
            catalog: SchemaCatalog::new(schema),
            identifiers,
        }
    }

    /// Drain and close the pool.
    pub async fn shutdown(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    context: GatewayContext,
    tools: ToolRegistry,
}

impl Dispatcher {
    pub fn new(context: GatewayContext) -> Self {
        Self {
            context,
            tools: ToolRegistry::new(),
        }
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }

    /// One schema resource per table in the catalog schema.
    pub async fn list_resources(&self) -> DbResult<Vec<ResourceDescriptor>> {
        let mut conn = ConnectionGuard::acquire(self.context.pool.as_ref()).await?;
        let tables = self.context.catalog.list_tables(&mut conn).await;
        conn.release().await;

        tables?
            .iter()
            .map(|table| resources::descriptor(&self.context.resource_base, table))
            .collect()
    }

    /// Column names and types of the table a schema URI points at.
    pub async fn read_resource(&self, uri: &str) -> DbResult<Vec<ResourceContent>> {
        let table = resources::parse_table(uri)?;

        let mut conn = ConnectionGuard::acquire(self.context.pool.as_ref()).await?;
        let columns = self.context.catalog.list_columns(&mut conn, &table).await;
        conn.release().await;

        Ok(vec![resources::content(uri, &columns?)?])
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.descriptors()
    }

    /// Run a tool.
    ///
    /// An unknown tool name is an `Err`. Every other failure (bad arguments,
    /// rejected statement, unreachable database) is reported as a tool
    /// response with `is_error` set.
    pub async fn call_tool(&self, name: &str, args: &JsonObject) -> DbResult<ToolResponse> {
        if !self.tools.contains(name) {
            warn!(tool = %name, "Unknown tool");
            return Err(DbError::unknown_tool(name));
        }

        match self.run_tool(name, args).await {
            Ok(text) => Ok(ToolResponse::success(text)),
            Err(DbError::UnknownTool { name }) => Err(DbError::UnknownTool { name }),
            Err(e) => {
                warn!(tool = %name, kind = e.kind(), error = %e, "Tool call failed");
                Ok(ToolResponse::error(e.to_tool_message()))
            }
        }
    }

    async fn run_tool(&self, name: &str, args: &JsonObject) -> DbResult<String> {
        let PreparedCall {
            statement,
            policy,
            outcome,
        } = self.tools.prepare(name, args, self.context.identifiers)?;

        let mut conn = ConnectionGuard::acquire(self.context.pool.as_ref()).await?;
        let rows = policy.run(&mut conn, &statement).await;
        conn.release().await;

        let rows = rows?;
        info!(tool = %name, rows = rows.len(), "Tool call succeeded");
        outcome.render(&rows)
    }
}
