//! MCP (Model Context Protocol) server support for Easel.
//!
//! This module exposes the template store and the generation pipeline as
//! tools for AI assistants and other MCP clients.
//!
//! ## Tools
//!
//! - `list_templates`, `get_template`, `create_template`,
//!   `update_template`, `delete_template`: template store CRUD
//! - `create_template_from_image`: build a template from an image
//!   analysis (requires client image sampling support)
//! - `generate_image`: assemble a prompt and generate content through the
//!   client's sampling capability, or return the prompt as text
//!
//! ## Usage
//!
//! Start the MCP server with:
//! ```bash
//! easel serve
//! ```
//!
//! The server communicates over stdio using the MCP protocol.

mod handler;
mod server;
mod tools;

pub use handler::EaselHandler;
pub use server::run_mcp_server;
pub use tools::{
    CreateTemplateFromImageTool, CreateTemplateTool, DeleteTemplateTool, GenerateImageTool,
    GetTemplateTool, ListTemplatesTool, UpdateTemplateTool,
};
