//! MCP server integration module.
//!
//! `dispatcher` holds the request logic; `service` binds it to the MCP
//! protocol through rmcp.

pub mod dispatcher;
pub mod service;

pub use dispatcher::{Dispatcher, GatewayContext};
pub use service::GatewayService;
