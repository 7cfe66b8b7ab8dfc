//! MCP server implementation for Easel.

use super::handler::EaselHandler;
use crate::store::TemplateStore;
use rust_mcp_sdk::{
    error::SdkResult,
    mcp_server::{server_runtime, McpServerOptions, ServerRuntime, ToMcpServerHandler},
    schema::{
        Implementation, InitializeResult, ProtocolVersion, ServerCapabilities,
        ServerCapabilitiesTools,
    },
    McpServer, StdioTransport, TransportOptions,
};
use std::sync::Arc;

/// Run the Easel MCP server over stdio.
pub async fn run_mcp_server(store: TemplateStore) -> SdkResult<()> {
    // Define server details
    let server_details = InitializeResult {
        server_info: Implementation {
            name: "easel".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            title: Some("Easel Prompt Templates".into()),
            description: Some(
                "MCP server for image-generation prompt templates. \
                 Stored templates supply default prompt parameters; callers \
                 override them per request and generate images through the \
                 client's sampling capability."
                    .into(),
            ),
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            ..Default::default()
        },
        meta: None,
        instructions: Some(
            "Use list_templates to discover stored prompt templates, then \
             generate_image with a templateId and any slot overrides. Without a \
             template, generate_image needs at least a subject. Clients without \
             sampling support receive the assembled prompt as text."
                .into(),
        ),
        protocol_version: ProtocolVersion::V2025_11_25.into(),
    };

    // Create stdio transport
    let transport = StdioTransport::new(TransportOptions::default())?;

    // Create handler
    let handler = EaselHandler::new(store);

    // Create and start server
    let server: Arc<ServerRuntime> = server_runtime::create_server(McpServerOptions {
        server_details,
        transport,
        handler: handler.to_mcp_server_handler(),
        task_store: None,
        client_task_store: None,
    });

    server.start().await
}
