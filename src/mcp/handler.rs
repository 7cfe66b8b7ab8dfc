//! MCP server handler for Easel.

use super::tools::{
    CreateTemplateFromImageTool, CreateTemplateTool, DeleteTemplateTool, GenerateImageTool,
    GetTemplateTool, ListTemplatesTool, UpdateTemplateTool,
};
use crate::capabilities::{negotiate, CapabilityProfile, FEATURE_IMAGE_CONTENT, FEATURE_SAMPLING};
use crate::error::Error;
use crate::sampling::{CompletionRequest, SamplingClient};
use crate::store::TemplateStore;
use async_trait::async_trait;
use log::debug;
use rust_mcp_sdk::{
    mcp_server::ServerHandler,
    schema::{
        schema_utils::CallToolError, CallToolRequestParams, CallToolResult,
        CreateMessageRequestParams, ListToolsResult, PaginatedRequestParams, RpcError,
        TextContent,
    },
    McpServer,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Token ceiling used when the client does not advertise one.
const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Easel MCP server handler. Holds the template store; everything else is
/// derived per request.
pub struct EaselHandler {
    store: Arc<TemplateStore>,
}

impl EaselHandler {
    pub fn new(store: TemplateStore) -> Self {
        Self { store: Arc::new(store) }
    }
}

/// Helper to create a text content response.
fn text_content(text: impl Into<String>) -> TextContent {
    TextContent::new(text.into(), None, None)
}

/// Serializes a successful tool result as pretty JSON text content.
fn json_result<T: serde::Serialize>(value: &T) -> CallToolResult {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    CallToolResult::text_content(vec![text_content(json)])
}

/// Reports a tool failure in-band, keeping client-input faults
/// distinguishable from server/upstream ones by code and flag.
fn error_result(err: &Error) -> CallToolResult {
    let payload = json!({
        "error": {
            "code": err.code(),
            "message": err.to_string(),
            "clientError": err.is_client_error(),
        }
    });
    CallToolResult::text_content(vec![text_content(
        serde_json::to_string_pretty(&payload).unwrap_or_else(|_| err.to_string()),
    )])
}

fn parse_tool<T: DeserializeOwned>(
    name: &str,
    arguments: Option<serde_json::Map<String, Value>>,
) -> Result<T, CallToolError> {
    let args = arguments.unwrap_or_default();
    serde_json::from_value(Value::Object(args)).map_err(|e| {
        CallToolError::invalid_arguments(name, Some(format!("Invalid arguments: {e}")))
    })
}

/// Derives the capability declaration from the connected client's
/// initialize-time capabilities.
///
/// The declaration handed to the negotiator is the raw capabilities
/// object; when the sampling entry itself signals image support, the
/// media feature is surfaced as a top-level key so the negotiator sees
/// one uniform shape.
fn capability_declaration(runtime: &dyn McpServer) -> Option<Value> {
    let info = runtime.client_info()?;
    let mut declaration = serde_json::to_value(&info.capabilities).ok()?;

    if let Some(map) = declaration.as_object_mut() {
        let signals_images = map
            .get(FEATURE_SAMPLING)
            .and_then(|s| s.get("images"))
            .map(|v| v.as_bool().unwrap_or(true))
            .unwrap_or(false);
        if signals_images {
            map.insert(FEATURE_IMAGE_CONTENT.to_string(), json!({}));
        }
    }
    Some(declaration)
}

fn profile_for(runtime: &dyn McpServer) -> CapabilityProfile {
    let declaration = capability_declaration(runtime);
    let profile = negotiate(declaration.as_ref());
    debug!(
        "negotiated capabilities: completion={} media={}",
        profile.supports_basic_completion, profile.supports_media_content
    );
    profile
}

/// Bridges the `SamplingClient` seam onto the server runtime's
/// createMessage request to the connected client.
struct RuntimeSamplingClient {
    runtime: Arc<dyn McpServer>,
}

#[async_trait]
impl SamplingClient for RuntimeSamplingClient {
    async fn create_message(&self, request: CompletionRequest) -> anyhow::Result<Value> {
        let mut params = json!({
            "messages": request.messages,
            "maxTokens": request.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
        });
        if let Some(object) = params.as_object_mut() {
            if let Some(temperature) = request.temperature {
                object.insert("temperature".into(), json!(temperature));
            }
            if !request.stop_sequences.is_empty() {
                object.insert("stopSequences".into(), json!(request.stop_sequences));
            }
            if let Some(model) = &request.model_hint {
                object.insert(
                    "modelPreferences".into(),
                    json!({ "hints": [{ "name": model }] }),
                );
            }
            if !request.metadata.is_empty() {
                object.insert("metadata".into(), Value::Object(request.metadata.clone()));
            }
        }

        let params: CreateMessageRequestParams = serde_json::from_value(params)
            .map_err(|e| anyhow::anyhow!("failed to build createMessage params: {e}"))?;
        let result = self
            .runtime
            .create_message(params)
            .await
            .map_err(|e| anyhow::anyhow!("createMessage request failed: {e}"))?;
        Ok(serde_json::to_value(result)?)
    }
}

#[async_trait]
impl ServerHandler for EaselHandler {
    /// Handle requests to list available tools.
    async fn handle_list_tools_request(
        &self,
        _params: Option<PaginatedRequestParams>,
        _runtime: Arc<dyn McpServer>,
    ) -> Result<ListToolsResult, RpcError> {
        Ok(ListToolsResult {
            tools: vec![
                ListTemplatesTool::tool(),
                GetTemplateTool::tool(),
                CreateTemplateTool::tool(),
                UpdateTemplateTool::tool(),
                DeleteTemplateTool::tool(),
                CreateTemplateFromImageTool::tool(),
                GenerateImageTool::tool(),
            ],
            meta: None,
            next_cursor: None,
        })
    }

    /// Handle requests to call a specific tool.
    async fn handle_call_tool_request(
        &self,
        params: CallToolRequestParams,
        runtime: Arc<dyn McpServer>,
    ) -> Result<CallToolResult, CallToolError> {
        let name = params.name.as_str();
        match name {
            "list_templates" => {
                let tool: ListTemplatesTool = parse_tool(name, params.arguments)?;
                Ok(match tool.execute(&self.store) {
                    Ok(templates) => json_result(&templates),
                    Err(e) => error_result(&e),
                })
            }
            "get_template" => {
                let tool: GetTemplateTool = parse_tool(name, params.arguments)?;
                Ok(match tool.execute(&self.store) {
                    Ok(record) => json_result(&record),
                    Err(e) => error_result(&e),
                })
            }
            "create_template" => {
                let tool: CreateTemplateTool = parse_tool(name, params.arguments)?;
                Ok(match tool.execute(&self.store) {
                    Ok(record) => json_result(&record),
                    Err(e) => error_result(&e),
                })
            }
            "update_template" => {
                let tool: UpdateTemplateTool = parse_tool(name, params.arguments)?;
                Ok(match tool.execute(&self.store) {
                    Ok(record) => json_result(&record),
                    Err(e) => error_result(&e),
                })
            }
            "delete_template" => {
                let tool: DeleteTemplateTool = parse_tool(name, params.arguments)?;
                Ok(match tool.execute(&self.store) {
                    Ok(message) => CallToolResult::text_content(vec![text_content(message)]),
                    Err(e) => error_result(&e),
                })
            }
            "create_template_from_image" => {
                let tool: CreateTemplateFromImageTool = parse_tool(name, params.arguments)?;
                let profile = profile_for(runtime.as_ref());
                let client = RuntimeSamplingClient { runtime: runtime.clone() };
                Ok(match tool.execute(&self.store, &client, &profile).await {
                    Ok(outcome) => json_result(&outcome),
                    Err(e) => error_result(&e),
                })
            }
            "generate_image" => {
                let tool: GenerateImageTool = parse_tool(name, params.arguments)?;
                let profile = profile_for(runtime.as_ref());
                let client = RuntimeSamplingClient { runtime: runtime.clone() };
                Ok(match tool.execute(&self.store, &client, &profile).await {
                    Ok(response) => json_result(&response),
                    Err(e) => error_result(&e),
                })
            }
            _ => Err(CallToolError::unknown_tool(params.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_creation() {
        let dir = tempfile::tempdir().unwrap();
        let _handler = EaselHandler::new(TemplateStore::with_dir(dir.path().to_path_buf()));
    }

    #[test]
    fn tool_parsing_rejects_malformed_arguments() {
        let args = serde_json::json!({ "id": 42 });
        let result: Result<GetTemplateTool, _> =
            parse_tool("get_template", args.as_object().cloned());
        assert!(result.is_err());
    }

    #[test]
    fn tool_parsing_accepts_missing_optional_arguments() {
        let tool: ListTemplatesTool = parse_tool("list_templates", None).unwrap();
        assert!(tool.sort_by.is_none());
    }
}
