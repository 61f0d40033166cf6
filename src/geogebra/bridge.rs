//! HTTP bridge session
//!
//! Talks JSON to a bridge process that hosts a GeoGebra applet. Each engine
//! call is one POST to `<base>/<endpoint>`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::EngineError;
use crate::geogebra::session::{CommandOutcome, EngineObject, EngineSession, ViewOptions};

/// Engine session backed by a GeoGebra bridge over HTTP
pub struct BridgeEngine {
    /// HTTP client
    http_client: reqwest::Client,

    /// Bridge base URL, without trailing slash
    base_url: String,

    timeout: Duration,

    /// Held for the duration of each request so the applet sees one call at a time
    in_flight: Mutex<()>,
}

#[derive(Deserialize)]
struct ExportReply {
    data: String,
}

#[derive(Deserialize)]
struct ReadyReply {
    ready: bool,
}

impl BridgeEngine {
    /// Create a bridge session from configuration
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            in_flight: Mutex::new(()),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// POST `body` to an endpoint, failing on non-2xx statuses
    async fn send(&self, endpoint: &str, body: Value) -> Result<reqwest::Response, EngineError> {
        let url = self.endpoint_url(endpoint);

        tracing::debug!("Bridge request: POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(status_error(endpoint, status, &text))
        }
    }

    /// POST and decode the JSON reply
    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
    ) -> Result<T, EngineError> {
        let _guard = self.in_flight.lock().await;
        let response = self.send(endpoint, body).await?;

        response.json().await.map_err(|e| EngineError::InvalidResponse {
            message: format!("{} returned malformed JSON: {}", endpoint, e),
        })
    }

    /// POST and ignore the reply body
    async fn post_unit(&self, endpoint: &str, body: Value) -> Result<(), EngineError> {
        let _guard = self.in_flight.lock().await;
        self.send(endpoint, body).await?;
        Ok(())
    }

    fn map_send_error(&self, err: reqwest::Error) -> EngineError {
        if err.is_timeout() {
            EngineError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            EngineError::from(err)
        }
    }
}

/// Map a non-2xx bridge reply. 503 means the applet is still loading.
fn status_error(endpoint: &str, status: reqwest::StatusCode, body: &str) -> EngineError {
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        EngineError::NotReady
    } else {
        EngineError::Request {
            message: format!("{} failed ({}): {}", endpoint, status, body),
        }
    }
}

#[async_trait]
impl EngineSession for BridgeEngine {
    async fn eval_command(&self, command: &str) -> Result<CommandOutcome, EngineError> {
        self.post("eval", json!({ "command": command })).await
    }

    async fn get_object_info(&self, name: &str) -> Result<Option<EngineObject>, EngineError> {
        self.post("object-info", json!({ "name": name })).await
    }

    async fn get_all_object_names(&self) -> Result<Vec<String>, EngineError> {
        self.post("object-names", json!({})).await
    }

    async fn new_construction(&self) -> Result<(), EngineError> {
        self.post_unit("new-construction", json!({})).await
    }

    async fn export_png(&self, view: &ViewOptions) -> Result<String, EngineError> {
        let reply: ExportReply = self.post("export/png", json!({ "view": view })).await?;
        Ok(reply.data)
    }

    async fn export_svg(&self, view: &ViewOptions) -> Result<String, EngineError> {
        let reply: ExportReply = self.post("export/svg", json!({ "view": view })).await?;
        Ok(reply.data)
    }

    async fn export_pdf(&self, view: &ViewOptions) -> Result<String, EngineError> {
        let reply: ExportReply = self.post("export/pdf", json!({ "view": view })).await?;
        Ok(reply.data)
    }

    async fn is_ready(&self) -> bool {
        match self.post::<ReadyReply>("ready", json!({})).await {
            Ok(reply) => reply.ready,
            Err(e) => {
                tracing::debug!("Bridge readiness check failed: {}", e);
                false
            }
        }
    }

    async fn cleanup(&self) -> Result<(), EngineError> {
        self.post_unit("cleanup", json!({})).await
    }
}
