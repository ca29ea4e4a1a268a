//! MCP tool implementations.
//!
//! This module contains the tool set exposed through `callTool`:
//! - Argument types and their JSON Schemas
//! - The name → prepare lookup table
//! - The transaction policy each tool runs under
//! - Success text shaping

pub mod input;
pub mod outcome;
pub mod policy;
pub mod registry;

pub use input::JsonObject;
pub use outcome::Outcome;
pub use policy::ExecutionPolicy;
pub use registry::{PreparedCall, ToolRegistry};
