//! `serve`: run the MCP server over stdio

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::GatewayConfig;
use crate::mcp::{McpServer, ServiceCatalog};
use crate::x402::ServiceGateway;

/// MCP serve arguments
#[derive(Args, Clone, Debug, Default)]
pub struct ServeArgs {}

pub async fn run(_args: ServeArgs, config: GatewayConfig) -> Result<()> {
    let catalog = ServiceCatalog::builtin().context("Invalid built-in service catalog")?;
    let gateway = ServiceGateway::new(config).context("Failed to initialize service gateway")?;

    tracing::info!(
        base_url = %gateway.config().base_url,
        has_api_key = gateway.config().has_api_key(),
        tools = catalog.tools.len(),
        "Starting Coin Railz MCP server"
    );

    McpServer::new(catalog, Arc::new(gateway)).run().await
}
