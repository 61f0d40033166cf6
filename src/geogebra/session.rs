//! Engine session abstraction
//!
//! One [`EngineSession`] is one stateful GeoGebra construction. The server
//! never mutates objects itself: every change is a command submitted through
//! [`EngineSession::eval_command`].

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Outcome of evaluating one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Whether the engine accepted the command
    pub success: bool,

    /// Engine-provided result or error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl CommandOutcome {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Some(reason.into()),
        }
    }
}

/// An object as reported by the engine. Read-only to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineObject {
    pub name: String,

    /// Object kind (`function`, `curve`, `implicitcurve`, `point`, ...)
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default = "default_true")]
    pub defined: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Viewport and rendering options for exports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewOptions {
    /// Left edge of the visible x range
    pub xmin: Option<f64>,

    /// Right edge of the visible x range
    pub xmax: Option<f64>,

    /// Bottom edge of the visible y range
    pub ymin: Option<f64>,

    /// Top edge of the visible y range
    pub ymax: Option<f64>,

    /// Output width in pixels
    pub width: Option<u32>,

    /// Output height in pixels
    pub height: Option<u32>,

    /// Whether to draw the axes
    pub show_axes: Option<bool>,

    /// Whether to draw the grid
    pub show_grid: Option<bool>,

    /// Export scale factor (PNG only)
    pub scale: Option<f64>,
}

/// Capability interface to one construction session.
///
/// Implementations must serialize mutations themselves; callers may issue
/// calls concurrently.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Evaluate a single command string
    async fn eval_command(&self, command: &str) -> Result<CommandOutcome, EngineError>;

    /// Look up one object by name; `None` if it does not exist
    async fn get_object_info(&self, name: &str) -> Result<Option<EngineObject>, EngineError>;

    /// Names of every object in the construction
    async fn get_all_object_names(&self) -> Result<Vec<String>, EngineError>;

    /// Discard the current construction
    async fn new_construction(&self) -> Result<(), EngineError>;

    /// Render as PNG, returned base64-encoded
    async fn export_png(&self, view: &ViewOptions) -> Result<String, EngineError>;

    /// Render as an SVG document
    async fn export_svg(&self, view: &ViewOptions) -> Result<String, EngineError>;

    /// Render as PDF, returned base64-encoded
    async fn export_pdf(&self, view: &ViewOptions) -> Result<String, EngineError>;

    /// Whether the session can accept commands
    async fn is_ready(&self) -> bool;

    /// Release any resources held by the session
    async fn cleanup(&self) -> Result<(), EngineError>;
}
