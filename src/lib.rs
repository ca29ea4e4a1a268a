//! PostgreSQL MCP Gateway Library
//!
//! Exposes a PostgreSQL database to MCP clients through table schema
//! resources and a fixed set of tools (`query`, `create_table`,
//! `insert_entry`, `update_entry`, `delete_entry`, `delete_table`).

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod resources;
pub mod sql;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::{Dispatcher, GatewayContext, GatewayService};
