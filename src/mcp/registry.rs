//! Tool registry
//!
//! Maps tool names to handlers, checks arguments against each tool's declared
//! schema, and normalizes every outcome into a [`CallToolResult`]. Nothing a
//! handler does can make `execute_tool` fail: unknown tools, bad arguments
//! and engine errors all become failure payloads.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::error::RegistryError;
use crate::geogebra::session::EngineSession;
use crate::mcp::tools::{self, ToolKind};
use crate::mcp::types::{error_codes, CallToolResult, Tool};

struct RegisteredTool {
    tool: Tool,
    kind: ToolKind,
}

/// Registration-ordered tool table
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. Names are unique; re-registering one is an error.
    pub fn register(&mut self, tool: Tool, kind: ToolKind) -> Result<(), RegistryError> {
        if self.index.contains_key(&tool.name) {
            return Err(RegistryError::DuplicateTool { name: tool.name });
        }

        self.index.insert(tool.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { tool, kind });
        Ok(())
    }

    /// Tool descriptors in registration order
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.tools.len()
    }

    /// Run a tool against `session` and wrap whatever happens
    pub async fn execute_tool(
        &self,
        session: &dyn EngineSession,
        name: &str,
        arguments: Value,
    ) -> CallToolResult {
        let Some(entry) = self.index.get(name).map(|&i| &self.tools[i]) else {
            tracing::debug!("Unknown tool requested: {}", name);
            return CallToolResult::failure(
                format!("Tool not found: {}", name),
                error_codes::TOOL_NOT_FOUND,
            );
        };

        let arguments = match check_arguments(&entry.tool.input_schema, arguments) {
            Ok(args) => args,
            Err(reason) => {
                tracing::debug!("Rejected arguments for {}: {}", name, reason);
                return CallToolResult::failure(
                    format!("Invalid arguments: {}", reason),
                    error_codes::INVALID_PARAMS,
                );
            }
        };

        tracing::debug!("Executing tool {}", name);

        match tools::dispatch(entry.kind, session, arguments).await {
            Ok(payload) => CallToolResult::from_payload(payload),
            Err(e) => {
                tracing::warn!("Tool {} failed: {}", name, e);
                CallToolResult::from_payload(json!({
                    "success": false,
                    "error": format!("Tool execution failed: {}", e),
                    "code": error_codes::TOOL_EXECUTION_ERROR,
                    "details": e.to_string(),
                }))
            }
        }
    }
}

/// Check `arguments` against the declared shape: an object, with every
/// required field present and every declared field of its primitive type.
/// `null` arguments count as an empty object; `null` fields count as absent.
pub fn check_arguments(schema: &Value, arguments: Value) -> Result<Value, String> {
    let args = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "arguments must be an object, got {}",
                json_type_name(&other)
            ))
        }
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if args.get(field).map_or(true, Value::is_null) {
                return Err(format!("missing required field '{}'", field));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (field, value) in &args {
            if value.is_null() {
                continue;
            }
            let Some(declared) = properties.get(field).and_then(|p| p.get("type")) else {
                continue;
            };
            if !type_matches(declared, value) {
                return Err(format!(
                    "field '{}' must be of type {}, got {}",
                    field,
                    describe_type(declared),
                    json_type_name(value)
                ));
            }
        }
    }

    Ok(Value::Object(args))
}

/// `declared` is a JSON Schema `type`: a name or a list of names
fn type_matches(declared: &Value, value: &Value) -> bool {
    match declared {
        Value::String(name) => primitive_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| primitive_matches(name, value)),
        _ => true,
    }
}

fn primitive_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(declared: &Value) -> String {
    match declared {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| *name != "null")
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.as_str().unwrap_or("unknown").to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
