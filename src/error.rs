//! Error types for the GeoGebra MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.
//! Validation failures are deliberately absent from the top-level error: they
//! are reported to clients as tool payloads, never as Rust errors.

use thiserror::Error;

/// Main error type for the GeoGebra MCP Server
#[derive(Error, Debug)]
pub enum GeoGebraMcpError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Engine session errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Tool registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while talking to an engine session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("engine request failed: {message}")]
    Request { message: String },

    #[error("engine did not respond within {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The bridge is up but its applet has not finished loading
    #[error("engine session is not ready")]
    NotReady,

    #[error("unexpected engine response: {message}")]
    InvalidResponse { message: String },
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            EngineError::Request {
                message: err.to_string(),
            }
        }
    }
}

/// Tool registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool already registered: {name}")]
    DuplicateTool { name: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    ReadFailed { path: String, message: String },

    #[error("Invalid environment variable {var}: {message}")]
    InvalidEnvVar { var: String, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Failures a tool handler can hit after its input has been validated.
///
/// The registry turns every one of these into a tool-execution-error payload.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("engine rejected command `{command}`: {message}")]
    CommandRejected { command: String, message: String },

    #[error("failed to serialize tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for GeoGebra MCP operations
pub type Result<T> = std::result::Result<T, GeoGebraMcpError>;
