//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations. Handlers validate
//! their own input and return failure payloads for bad input; only engine
//! trouble comes back as `Err`.

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{EngineError, RegistryError, ToolError};
use crate::geogebra::commands;
use crate::geogebra::session::{EngineSession, ViewOptions};
use crate::geogebra::validation::{
    self, FunctionPlotRequest, ImplicitPlotRequest, ParametricPlotRequest, PlotStyling,
    DEFAULT_PARAMETER, MAX_THICKNESS, MIN_THICKNESS,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::types::Tool;

/// Every handler the server knows, keyed by enum rather than by closure so
/// the name → handler table stays a plain static mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    PlotFunction,
    PlotParametric,
    PlotImplicit,
    GetObjects,
    ClearConstruction,
    InstanceStatus,
    ExportPng,
    ExportSvg,
    ExportPdf,
}

/// Build the registry with every tool, in listing order
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let tools = [
        (
            "geogebra_plot_function",
            "Plot a function f(x), optionally restricted to a domain, with optional styling",
            plot_function_schema(),
            ToolKind::PlotFunction,
        ),
        (
            "geogebra_plot_parametric",
            "Plot a parametric curve (x(t), y(t)) over a parameter range, with optional styling",
            plot_parametric_schema(),
            ToolKind::PlotParametric,
        ),
        (
            "geogebra_plot_implicit",
            "Plot an implicit curve F(x, y) = 0, with optional styling",
            plot_implicit_schema(),
            ToolKind::PlotImplicit,
        ),
        (
            "geogebra_get_objects",
            "List every object in the current construction",
            empty_schema(),
            ToolKind::GetObjects,
        ),
        (
            "geogebra_clear_construction",
            "Remove all objects and start a new construction",
            empty_schema(),
            ToolKind::ClearConstruction,
        ),
        (
            "geogebra_instance_status",
            "Report whether the GeoGebra session is ready",
            empty_schema(),
            ToolKind::InstanceStatus,
        ),
        (
            "geogebra_export_png",
            "Export the construction as a base64-encoded PNG image",
            view_schema(),
            ToolKind::ExportPng,
        ),
        (
            "geogebra_export_svg",
            "Export the construction as an SVG document",
            view_schema(),
            ToolKind::ExportSvg,
        ),
        (
            "geogebra_export_pdf",
            "Export the construction as a base64-encoded PDF document",
            view_schema(),
            ToolKind::ExportPdf,
        ),
    ];

    let mut registry = ToolRegistry::new();
    for (name, description, schema, kind) in tools {
        registry.register(tool_def(name, description, schema), kind)?;
    }

    Ok(registry)
}

/// Run the handler for `kind`
pub async fn dispatch(
    kind: ToolKind,
    session: &dyn EngineSession,
    args: Value,
) -> Result<Value, ToolError> {
    match kind {
        ToolKind::PlotFunction => handle_plot_function(session, args).await,
        ToolKind::PlotParametric => handle_plot_parametric(session, args).await,
        ToolKind::PlotImplicit => handle_plot_implicit(session, args).await,
        ToolKind::GetObjects => handle_get_objects(session).await,
        ToolKind::ClearConstruction => handle_clear_construction(session).await,
        ToolKind::InstanceStatus => handle_instance_status(session).await,
        ToolKind::ExportPng => handle_export_png(session, args).await,
        ToolKind::ExportSvg => handle_export_svg(session, args).await,
        ToolKind::ExportPdf => handle_export_pdf(session, args).await,
    }
}

// ==================== Payload helpers ====================

fn failure_payload(error: impl std::fmt::Display) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
    })
}

/// Decode typed arguments; a mismatch becomes a failure payload
fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, Value> {
    serde_json::from_value(args).map_err(|e| failure_payload(format!("Invalid arguments: {}", e)))
}

/// Submit a defining command; an engine refusal is an execution error
async fn submit(session: &dyn EngineSession, command: &str) -> Result<(), ToolError> {
    tracing::debug!("Submitting command: {}", command);

    let outcome = session.eval_command(command).await?;
    if !outcome.success {
        return Err(ToolError::CommandRejected {
            command: command.to_string(),
            message: outcome
                .result
                .unwrap_or_else(|| "no detail from engine".to_string()),
        });
    }
    Ok(())
}

/// Apply styling setters after the object exists.
///
/// A failed setter leaves the object in place, partially styled. Failures
/// are collected as warnings for the payload.
async fn apply_styling(
    session: &dyn EngineSession,
    name: &str,
    styling: &PlotStyling,
) -> Vec<String> {
    let mut warnings = Vec::new();

    for command in commands::styling_commands(name, styling) {
        let failure = match session.eval_command(&command).await {
            Ok(outcome) if outcome.success => None,
            Ok(outcome) => Some(outcome.result.unwrap_or_else(|| "rejected".to_string())),
            Err(e) => Some(e.to_string()),
        };

        if let Some(reason) = failure {
            tracing::warn!("Styling command `{}` failed: {}", command, reason);
            warnings.push(format!("{}: {}", command, reason));
        }
    }

    warnings
}

fn finish_plot(
    mut payload: Value,
    styling: &PlotStyling,
    warnings: Vec<String>,
) -> Result<Value, ToolError> {
    payload["styling"] = serde_json::to_value(styling)?;
    if !warnings.is_empty() {
        payload["warnings"] = json!(warnings);
    }
    Ok(payload)
}

// ==================== Tool Handlers ====================

async fn handle_plot_function(
    session: &dyn EngineSession,
    args: Value,
) -> Result<Value, ToolError> {
    let request: FunctionPlotRequest = match parse_args(args) {
        Ok(r) => r,
        Err(payload) => return Ok(payload),
    };

    let plot = match validation::validate_function_plot(request) {
        Ok(p) => p,
        Err(e) => return Ok(failure_payload(e)),
    };

    let command = commands::function_command(&plot);
    submit(session, &command).await?;
    let warnings = apply_styling(session, &plot.name, &plot.styling).await;
    let object = session.get_object_info(&plot.name).await?;

    let mut payload = json!({
        "success": true,
        "command": command,
        "function": object,
    });
    if let Some(domain) = plot.domain {
        payload["domain"] = json!({ "xMin": domain.min, "xMax": domain.max });
    }

    finish_plot(payload, &plot.styling, warnings)
}

async fn handle_plot_parametric(
    session: &dyn EngineSession,
    args: Value,
) -> Result<Value, ToolError> {
    let request: ParametricPlotRequest = match parse_args(args) {
        Ok(r) => r,
        Err(payload) => return Ok(payload),
    };

    let plot = match validation::validate_parametric_plot(request) {
        Ok(p) => p,
        Err(e) => return Ok(failure_payload(e)),
    };

    let command = commands::parametric_command(&plot);
    submit(session, &command).await?;
    let warnings = apply_styling(session, &plot.name, &plot.styling).await;
    let object = session.get_object_info(&plot.name).await?;

    let payload = json!({
        "success": true,
        "command": command,
        "curve": object,
        "parametric": {
            "xExpression": plot.x_expression,
            "yExpression": plot.y_expression,
            "parameter": plot.parameter,
            "range": { "tMin": plot.range.min, "tMax": plot.range.max },
        },
    });

    finish_plot(payload, &plot.styling, warnings)
}

async fn handle_plot_implicit(
    session: &dyn EngineSession,
    args: Value,
) -> Result<Value, ToolError> {
    let request: ImplicitPlotRequest = match parse_args(args) {
        Ok(r) => r,
        Err(payload) => return Ok(payload),
    };

    let plot = match validation::validate_implicit_plot(request) {
        Ok(p) => p,
        Err(e) => return Ok(failure_payload(e)),
    };

    let command = commands::implicit_command(&plot);
    submit(session, &command).await?;
    let warnings = apply_styling(session, &plot.name, &plot.styling).await;
    let object = session.get_object_info(&plot.name).await?;

    let payload = json!({
        "success": true,
        "command": command,
        "curve": object,
        "implicit": { "expression": plot.expression },
    });

    finish_plot(payload, &plot.styling, warnings)
}

async fn handle_get_objects(session: &dyn EngineSession) -> Result<Value, ToolError> {
    let names = session.get_all_object_names().await?;

    let mut objects = Vec::with_capacity(names.len());
    for name in &names {
        match session.get_object_info(name).await? {
            Some(object) => objects.push(object),
            None => tracing::debug!("Object {} disappeared before it could be read", name),
        }
    }

    Ok(json!({
        "success": true,
        "objectCount": objects.len(),
        "objects": objects,
    }))
}

async fn handle_clear_construction(session: &dyn EngineSession) -> Result<Value, ToolError> {
    session.new_construction().await?;
    Ok(json!({
        "success": true,
        "message": "Construction cleared",
    }))
}

async fn handle_instance_status(session: &dyn EngineSession) -> Result<Value, ToolError> {
    let ready = session.is_ready().await;
    Ok(json!({
        "success": true,
        "ready": ready,
    }))
}

/// Parse and check export view options
fn view_options(args: Value) -> Result<ViewOptions, Value> {
    let view: ViewOptions = parse_args(args)?;
    validation::validate_view(&view).map_err(failure_payload)?;
    Ok(view)
}

/// Decode a base64 export so a corrupt payload never reaches the client
fn decoded_len(format: &str, data: &str) -> Result<usize, ToolError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map(|bytes| bytes.len())
        .map_err(|e| {
            ToolError::Engine(EngineError::InvalidResponse {
                message: format!("{} export is not valid base64: {}", format, e),
            })
        })
}

async fn handle_export_png(session: &dyn EngineSession, args: Value) -> Result<Value, ToolError> {
    let view = match view_options(args) {
        Ok(v) => v,
        Err(payload) => return Ok(payload),
    };

    let data = session.export_png(&view).await?;
    let size = decoded_len("PNG", &data)?;

    Ok(json!({
        "success": true,
        "format": "png",
        "data": data.trim(),
        "sizeBytes": size,
    }))
}

async fn handle_export_svg(session: &dyn EngineSession, args: Value) -> Result<Value, ToolError> {
    let view = match view_options(args) {
        Ok(v) => v,
        Err(payload) => return Ok(payload),
    };

    let svg = session.export_svg(&view).await?;
    if !svg.contains("<svg") {
        return Err(EngineError::InvalidResponse {
            message: "SVG export does not contain an <svg> element".to_string(),
        }
        .into());
    }

    Ok(json!({
        "success": true,
        "format": "svg",
        "svg": svg,
    }))
}

async fn handle_export_pdf(session: &dyn EngineSession, args: Value) -> Result<Value, ToolError> {
    let view = match view_options(args) {
        Ok(v) => v,
        Err(payload) => return Ok(payload),
    };

    let data = session.export_pdf(&view).await?;
    let size = decoded_len("PDF", &data)?;

    Ok(json!({
        "success": true,
        "format": "pdf",
        "data": data.trim(),
        "sizeBytes": size,
    }))
}

// ==================== Schema Definitions ====================

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Add the shared styling properties to a schema
fn with_styling(mut schema: Value) -> Value {
    let styling = json!({
        "color": {
            "type": "string",
            "description": "Line color as a hex value, e.g. #FF0000"
        },
        "thickness": {
            "type": "number",
            "minimum": MIN_THICKNESS,
            "maximum": MAX_THICKNESS,
            "description": "Line thickness (1-10), rounded to a whole number"
        },
        "style": {
            "type": "string",
            "enum": validation::LineStyle::NAMES,
            "description": "Line style"
        }
    });

    if let (Some(properties), Value::Object(extra)) =
        (schema.get_mut("properties").and_then(Value::as_object_mut), styling)
    {
        properties.extend(extra);
    }
    schema
}

fn plot_function_schema() -> Value {
    with_styling(json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the function (e.g. f)"
            },
            "expression": {
                "type": "string",
                "description": "Expression in x (e.g. x^2 + 2*x - 1)"
            },
            "xMin": {
                "type": "number",
                "description": "Lower bound of the domain"
            },
            "xMax": {
                "type": "number",
                "description": "Upper bound of the domain"
            }
        },
        "required": ["name", "expression"]
    }))
}

fn plot_parametric_schema() -> Value {
    with_styling(json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the curve"
            },
            "xExpression": {
                "type": "string",
                "description": "x component in terms of the parameter (e.g. cos(t))"
            },
            "yExpression": {
                "type": "string",
                "description": "y component in terms of the parameter (e.g. sin(t))"
            },
            "parameter": {
                "type": "string",
                "default": DEFAULT_PARAMETER,
                "description": "Parameter variable name"
            },
            "tMin": {
                "type": "number",
                "description": "Start of the parameter range"
            },
            "tMax": {
                "type": "number",
                "description": "End of the parameter range"
            }
        },
        "required": ["name", "xExpression", "yExpression", "tMin", "tMax"]
    }))
}

fn plot_implicit_schema() -> Value {
    with_styling(json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "Name of the curve"
            },
            "expression": {
                "type": "string",
                "description": "Curve F(x, y) = 0 given as F, e.g. x^2 + y^2 - 4"
            }
        },
        "required": ["name", "expression"]
    }))
}

/// Export view schema, derived from [`ViewOptions`]
fn view_schema() -> Value {
    let schema = schemars::schema_for!(ViewOptions);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| empty_schema());

    if let Some(map) = value.as_object_mut() {
        map.remove("$schema");
        map.remove("title");
    }
    value
}
