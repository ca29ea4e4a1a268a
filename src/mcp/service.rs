//! MCP service implementation using rmcp.
//!
//! `GatewayService` adapts the transport-independent [`Dispatcher`] to
//! rmcp's `ServerHandler`: it converts requests in and envelopes out, and
//! maps dispatcher errors to protocol errors.

use super::dispatcher::Dispatcher;
use crate::models::{ResourceContent, ResourceDescriptor, ToolDescriptor, ToolResponse};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, Content, Implementation,
        ListResourcesResult, ListToolsResult, PaginatedRequestParam, ProtocolVersion, RawResource,
        ReadResourceRequestParam, ReadResourceResult, Resource, ResourceContents,
        ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GatewayService {
    dispatcher: Arc<Dispatcher>,
}

impl GatewayService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

fn to_tool(descriptor: ToolDescriptor) -> Tool {
    Tool::new(
        descriptor.name,
        descriptor.description,
        Arc::new(descriptor.input_schema),
    )
}

fn to_resource(descriptor: ResourceDescriptor) -> Resource {
    let mut raw = RawResource::new(descriptor.uri, descriptor.name);
    raw.description = Some(descriptor.description);
    raw.mime_type = Some(descriptor.mime_type);
    raw.no_annotation()
}

fn to_resource_contents(content: ResourceContent) -> ResourceContents {
    let mut contents = ResourceContents::text(content.text, content.uri);
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = Some(content.mime_type);
    }
    contents
}

fn to_call_result(response: ToolResponse) -> CallToolResult {
    let content = response
        .content
        .iter()
        .map(|block| Content::text(block.as_text()))
        .collect();
    if response.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

impl ServerHandler for GatewayService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "pg-mcp-gateway".to_owned(),
                title: Some("PostgreSQL MCP Gateway".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "PostgreSQL access through schema resources and CRUD tools.\n\
                \n\
                ## Workflow\n\
                1. List resources to see the tables; read `<table>/schema` for its columns\n\
                2. Use `query` for reads. It runs in a read-only transaction that is always rolled back\n\
                3. Use `create_table`, `insert_entry`, `update_entry`, `delete_entry`, `delete_table` for changes\n\
                \n\
                ## Notes\n\
                - `values` and `conditions` map column names to values; values are always sent as parameters\n\
                - Table and column names are written into SQL as given\n\
                - `query` accepts exactly one statement"
                    .to_string(),
            ),
        }
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            let resources = self
                .dispatcher
                .list_resources()
                .await?
                .into_iter()
                .map(to_resource)
                .collect();
            Ok(ListResourcesResult::with_all_items(resources))
        }
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            let contents = self
                .dispatcher
                .read_resource(&request.uri)
                .await?
                .into_iter()
                .map(to_resource_contents)
                .collect();
            Ok(ReadResourceResult { contents })
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            let tools = self
                .dispatcher
                .list_tools()
                .into_iter()
                .map(to_tool)
                .collect();
            Ok(ListToolsResult::with_all_items(tools))
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let args = request.arguments.unwrap_or_default();
            let response = self.dispatcher.call_tool(&request.name, &args).await?;
            Ok(to_call_result(response))
        }
    }
}
