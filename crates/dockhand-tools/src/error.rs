//! Error types for tool dispatch.

use dockhand_registry::RegistryError;
use thiserror::Error;

/// Result type alias using [`ToolError`] as the error type.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised while dispatching a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("Unknown tool: {name}")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// The arguments do not match the tool's input schema.
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments {
        /// Tool name.
        tool: &'static str,
        /// Deserialization error.
        message: String,
    },

    /// The registry operation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The result could not be rendered.
    #[error("Failed to render result: {0}")]
    Render(#[from] serde_json::Error),
}

impl ToolError {
    /// Creates an unknown tool error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool { name: name.into() }
    }

    /// Creates an invalid arguments error.
    pub fn invalid_arguments(tool: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            message: message.into(),
        }
    }
}
