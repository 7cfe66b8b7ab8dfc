//! # Easel
//!
//! MCP server for image-generation prompt templates: stored defaults,
//! caller overrides, deterministic prompt assembly, and completion
//! through the client's sampling capability.

/// Handles argument parsing.
pub mod args;

/// Deterministic prompt assembly from resolved parameters.
pub mod assemble;

/// Capability declaration negotiation.
pub mod capabilities;

/// Defines custom error types.
pub mod error;

/// Request orchestration across merge, assembly and completion.
pub mod generate;

/// MCP server, handler and tool definitions.
pub mod mcp;

/// Prompt parameter slots and the merge engine.
pub mod params;

/// Completion request model and the remote completion gateway.
pub mod sampling;

/// Flat-file template store.
pub mod store;

/// Template records and mutation inputs.
pub mod template;

pub use args::{get_cli, get_log_level_from_verbose, Cli, Commands};
pub use mcp::run_mcp_server;
pub use store::TemplateStore;
