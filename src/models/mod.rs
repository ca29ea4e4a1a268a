//! Data models for the gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod envelope;
pub mod schema;
pub mod value;

pub use envelope::{
    ContentBlock, ResourceContent, ResourceDescriptor, SCHEMA_MIME_TYPE, ToolDescriptor,
    ToolResponse,
};
pub use schema::{ColumnDef, ColumnInfo};
pub use value::SqlValue;
