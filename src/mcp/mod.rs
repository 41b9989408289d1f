//! MCP (Model Context Protocol) server
//!
//! Exposes every Coin Railz service as an MCP tool:
//!
//! - JSON-RPC over stdio transport
//! - Embedded service catalog with argument shaping
//! - Calls routed through the payment-aware service gateway
//!
//! # Example
//!
//! ```bash
//! # Claude Desktop launches this as a stdio server
//! coinrailz-mcp serve
//! ```

pub mod catalog;
pub mod protocol;
pub mod server;

pub use catalog::{CatalogError, ServiceCatalog, ToolSpec};
pub use server::McpServer;
