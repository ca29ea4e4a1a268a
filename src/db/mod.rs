//! Database access layer.
//!
//! This module provides database access functionality:
//! - The connection seam and its PostgreSQL implementation
//! - Parameter coercion and binding
//! - Schema catalog reads
//! - Row decoding to JSON

pub(crate) mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use pool::{ConnectionGuard, ConnectionSource, PgConnectionSource, PgSession, Session};
pub use schema::SchemaCatalog;
pub use types::JsonRow;
