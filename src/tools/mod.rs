//! Tools module - capabilities participants can invoke by name
//!
//! Contains the tool trait, the registry, declarative descriptors, MCP tool
//! servers, and the built-in remote and local tool providers.

pub mod descriptor;
pub mod file;
pub mod http;
pub mod image;
pub mod langflow;
pub mod mcp;
pub mod registry;
pub mod traits;
pub mod weather;

pub use descriptor::ToolDescriptor;
pub use http::{HttpTool, RemoteClient, RemoteEndpoint};
pub use mcp::{McpServer, McpTool, McpTransportKind};
pub use registry::{ToolHandle, ToolRegistry};
pub use traits::{FnTool, Tool};
