//! Error types for the tool server.
//!
//! The `Display` output of [`DispatchError`] is exactly what a caller sees in
//! `error.message`.

use std::time::Duration;

/// Startup-time registry configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A tool with the same name was already registered.
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    /// Tool names must be non-empty.
    #[error("Tool name must not be empty")]
    EmptyName,

    /// The declared input schema cannot be compiled into a contract.
    #[error("Invalid input schema for tool '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },
}

/// A tool's input schema could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SchemaError(pub String);

/// A supplied argument does not have the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub field: String,
    pub expected: String,
    pub actual: &'static str,
}

/// Call arguments rejected before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Arguments must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Missing required argument(s): {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("{}", describe_mismatches(.0))]
    InvalidTypes(Vec<TypeMismatch>),
}

impl ValidationError {
    /// Names of the offending fields
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::NotAnObject(_) => Vec::new(),
            Self::MissingRequired(fields) => fields.iter().map(String::as_str).collect(),
            Self::InvalidTypes(mismatches) => mismatches.iter().map(|m| m.field.as_str()).collect(),
        }
    }
}

fn describe_mismatches(mismatches: &[TypeMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| {
            format!(
                "Invalid argument '{}': expected {}, got {}",
                m.field, m.expected, m.actual
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Any failure reachable from a single request. Always converted into an
/// error response; never terminates the session.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error("Missing tool name")]
    MissingToolName,

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    InvalidArguments(#[from] ValidationError),

    /// The handler returned an error; carries its message.
    #[error("{0}")]
    ToolFailed(String),

    #[error("Tool '{tool}' timed out after {}s", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },

    #[error("Tool '{0}' panicked")]
    Panicked(String),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// Short machine-friendly label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownMethod(_) => "unknown_method",
            Self::UnknownTool(_) => "unknown_tool",
            Self::MissingToolName | Self::InvalidParams(_) => "invalid_params",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::ToolFailed(_) => "tool_failed",
            Self::Timeout { .. } => "timeout",
            Self::Panicked(_) => "panicked",
            Self::Encode(_) => "internal",
        }
    }
}
