//! Error types for the gateway.
//!
//! Every failure a request can hit is one of the variants below. Each variant
//! carries enough context for an agent to understand and correct the call.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Missing or malformed tool arguments.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Invalid resource URI '{uri}': {reason}")]
    InvalidResource { uri: String, reason: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// The database rejected the statement.
    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    /// Pool exhausted, closed, or engine unreachable.
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid resource error.
    pub fn invalid_resource(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResource {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short machine-readable name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "validation",
            Self::InvalidResource { .. } => "invalid_resource",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::Database { .. } => "statement",
            Self::Connection { .. } => "connection",
            Self::Internal { .. } => "internal",
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Message shown to the agent inside a tool error result.
    pub fn to_tool_message(&self) -> String {
        match self {
            Self::Database {
                message,
                sql_state: Some(code),
                suggestion,
            } => format!("Database error: {} (SQLSTATE: {}). {}", message, code, suggestion),
            other => match other.suggestion() {
                Some(suggestion) => format!("{}. {}", other, suggestion),
                None => other.to_string(),
            },
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                let suggestion = statement_suggestion(code.as_deref());
                DbError::database(db_err.message(), code, suggestion)
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a pooled connection",
                "The pool is exhausted; retry later or raise --max-connections",
            ),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The server is shutting down",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::Encode(source) => DbError::database(
                format!("Failed to encode parameter: {}", source),
                None,
                "Check that each value matches the column type",
            ),
            sqlx::Error::WorkerCrashed => DbError::connection(
                "Database worker crashed",
                "Restart the server",
            ),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Pick a suggestion from the SQLSTATE class.
fn statement_suggestion(sql_state: Option<&str>) -> &'static str {
    match sql_state {
        Some("42P01") => "The table does not exist; list resources to see available tables",
        Some("42703") => "A column does not exist; read the table's schema resource",
        Some("42P07") => "The table already exists",
        Some("42601") => "Check the SQL syntax",
        Some("25006") => "The query tool is read-only; use the insert/update/delete tools",
        Some(code) if code.starts_with("23") => "The values violate a table constraint",
        Some(code) if code.starts_with("22") => "A value does not fit the column type",
        _ => "Check the SQL syntax and referenced objects",
    }
}

/// Result type alias for gateway operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            DbError::InvalidInput { .. } | DbError::UnknownTool { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::InvalidResource { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(Some(
                    "Resource URIs end in '<table>/schema'; list resources to get valid URIs",
                )),
            ),

            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            DbError::Connection { suggestion, .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(Some(suggestion)))
            }

            DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}
