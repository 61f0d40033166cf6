//! Shared test fixtures: a recording, in-memory engine session

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use geogebra_mcp_server::error::EngineError;
use geogebra_mcp_server::geogebra::{CommandOutcome, EngineObject, EngineSession, ViewOptions};
use geogebra_mcp_server::mcp::tools::default_registry;
use geogebra_mcp_server::mcp::types::CallToolResult;

/// 1x1 transparent PNG
pub const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Engine double that records every command and keeps a tiny object table
#[derive(Default)]
pub struct FakeEngine {
    commands: Mutex<Vec<String>>,
    objects: Mutex<BTreeMap<String, EngineObject>>,
    rejected_prefixes: Mutex<Vec<String>>,
    offline: Mutex<bool>,
    png_data: Mutex<Option<String>>,
    exports: Mutex<Vec<ViewOptions>>,
    cleanups: Mutex<usize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command submitted so far
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Make the engine refuse commands starting with `prefix`
    pub fn reject_commands_starting_with(&self, prefix: &str) {
        self.rejected_prefixes.lock().unwrap().push(prefix.to_string());
    }

    /// Make every call fail as if the bridge were unreachable
    pub fn go_offline(&self) {
        *self.offline.lock().unwrap() = true;
    }

    pub fn set_png_data(&self, data: &str) {
        *self.png_data.lock().unwrap() = Some(data.to_string());
    }

    pub fn exports(&self) -> Vec<ViewOptions> {
        self.exports.lock().unwrap().clone()
    }

    pub fn cleanups(&self) -> usize {
        *self.cleanups.lock().unwrap()
    }

    pub fn insert_object(&self, object: EngineObject) {
        self.objects
            .lock()
            .unwrap()
            .insert(object.name.clone(), object);
    }

    fn check_online(&self) -> Result<(), EngineError> {
        if *self.offline.lock().unwrap() {
            Err(EngineError::Request {
                message: "connection refused".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Mimic the engine creating or restyling an object
    fn apply(&self, command: &str) {
        let mut objects = self.objects.lock().unwrap();

        if let Some(rest) = command.strip_prefix("SetColor(") {
            if let Some((name, color)) = rest.trim_end_matches(')').split_once(", ") {
                if let Some(object) = objects.get_mut(name) {
                    object.color = Some(color.trim_matches('"').to_string());
                }
            }
            return;
        }
        if command.starts_with("Set") {
            return;
        }

        let Some((lhs, rhs)) = command.split_once(" = ") else {
            return;
        };
        let (name, kind) = match lhs.strip_suffix("(x)") {
            Some(name) => (name, "function"),
            None if rhs.starts_with("ImplicitCurve(") => (lhs, "implicitcurve"),
            None if rhs.starts_with("Curve(") => (lhs, "curve"),
            None => (lhs, "numeric"),
        };

        objects.insert(
            name.to_string(),
            EngineObject {
                name: name.to_string(),
                kind: kind.to_string(),
                value: Some(rhs.to_string()),
                visible: true,
                defined: true,
                color: Some("#000000".to_string()),
            },
        );
    }
}

#[async_trait]
impl EngineSession for FakeEngine {
    async fn eval_command(&self, command: &str) -> Result<CommandOutcome, EngineError> {
        self.check_online()?;
        self.commands.lock().unwrap().push(command.to_string());

        let rejected = self
            .rejected_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|prefix| command.starts_with(prefix.as_str()));
        if rejected {
            return Ok(CommandOutcome::rejected("Syntax error"));
        }

        self.apply(command);
        Ok(CommandOutcome::ok(command))
    }

    async fn get_object_info(&self, name: &str) -> Result<Option<EngineObject>, EngineError> {
        self.check_online()?;
        Ok(self.objects.lock().unwrap().get(name).cloned())
    }

    async fn get_all_object_names(&self) -> Result<Vec<String>, EngineError> {
        self.check_online()?;
        Ok(self.objects.lock().unwrap().keys().cloned().collect())
    }

    async fn new_construction(&self) -> Result<(), EngineError> {
        self.check_online()?;
        self.objects.lock().unwrap().clear();
        Ok(())
    }

    async fn export_png(&self, view: &ViewOptions) -> Result<String, EngineError> {
        self.check_online()?;
        self.exports.lock().unwrap().push(view.clone());
        Ok(self
            .png_data
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| TINY_PNG_BASE64.to_string()))
    }

    async fn export_svg(&self, view: &ViewOptions) -> Result<String, EngineError> {
        self.check_online()?;
        self.exports.lock().unwrap().push(view.clone());
        Ok(r#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#.to_string())
    }

    async fn export_pdf(&self, view: &ViewOptions) -> Result<String, EngineError> {
        self.check_online()?;
        self.exports.lock().unwrap().push(view.clone());
        Ok("JVBERi0xLjQK".to_string())
    }

    async fn is_ready(&self) -> bool {
        !*self.offline.lock().unwrap()
    }

    async fn cleanup(&self) -> Result<(), EngineError> {
        *self.cleanups.lock().unwrap() += 1;
        Ok(())
    }
}

/// Call a tool through the default registry and decode its payload
pub async fn call(engine: &FakeEngine, tool: &str, args: Value) -> (CallToolResult, Value) {
    let registry = default_registry().expect("default registry builds");
    let result = registry.execute_tool(engine, tool, args).await;

    assert_eq!(result.content.len(), 1, "exactly one content block");
    let payload = result.payload().expect("payload is JSON");
    assert!(payload["success"].is_boolean(), "payload has boolean success");
    assert_eq!(result.is_error, payload["success"] == false);

    (result, payload)
}
