//! `tools`: list the tools served over MCP with their prices

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use crate::mcp::ServiceCatalog;

use super::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ToolsArgs {
    /// Only list tools in this category (e.g. trading, banking, enterprise)
    #[arg(short = 'c', long)]
    pub category: Option<String>,

    /// Output format: text or json
    #[arg(short = 'o', long, default_value = "text")]
    pub output: OutputFormat,
}

pub fn run(args: ToolsArgs) -> Result<()> {
    let catalog = ServiceCatalog::builtin().context("Invalid built-in service catalog")?;
    let tools: Vec<_> = catalog
        .tools
        .iter()
        .filter(|t| match &args.category {
            Some(category) => t.category.as_deref() == Some(category.as_str()),
            None => true,
        })
        .collect();

    match args.output {
        OutputFormat::Json => {
            let listing: Vec<_> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "service": t.service,
                        "category": t.category,
                        "price": t.price,
                        "free_tier": t.is_free_tier(),
                        "inputSchema": t.input_schema(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            println!("Available tools:");
            println!();
            for tool in &tools {
                let free = if tool.is_free_tier() { " (first call free)" } else { "" };
                println!("  {:<36} {:>20}{}", tool.name, tool.price, free);
            }
            println!();
            println!("Total: {} tools", tools.len());
        }
    }

    Ok(())
}
