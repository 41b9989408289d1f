//! `call`: invoke one tool from the command line without running the server

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use crate::config::GatewayConfig;
use crate::mcp::ServiceCatalog;
use crate::x402::ServiceGateway;

use super::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct CallArgs {
    /// Tool name as listed by `tools`
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Input arguments as JSON object
    ///
    /// Example: --input '{"token_address": "0x...", "chain": "base"}'
    ///
    #[arg(short = 'i', long, value_name = "JSON")]
    pub input: Option<String>,

    /// Input argument as key=value (can be repeated)
    ///
    /// Values are parsed as JSON if possible, otherwise as strings.
    /// Example: -a chain=base -a limit=5
    ///
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,

    /// Output format: text or json
    #[arg(short = 'o', long, default_value = "text")]
    pub output: OutputFormat,
}

pub async fn run(args: CallArgs, config: GatewayConfig) -> Result<()> {
    let catalog = ServiceCatalog::builtin().context("Invalid built-in service catalog")?;

    let input = match &args.input {
        Some(json) => serde_json::from_str::<Value>(json).context("Failed to parse --input JSON")?,
        None => Value::Object(Default::default()),
    };
    let arguments = merge_json(input, parse_args_to_json(&args.args)?);

    let call = catalog
        .prepare(&args.tool, Some(&arguments))
        .with_context(|| format!("Cannot call {}", args.tool))?;

    let gateway = ServiceGateway::new(config).context("Failed to initialize service gateway")?;
    let outcome = gateway.invoke(&call).await?;
    let rendered = outcome.to_tool_value(&call.service);

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string(&rendered)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&rendered)?),
    }

    if !outcome.is_success() {
        anyhow::bail!("{} did not succeed", args.tool);
    }
    Ok(())
}

/// Parse KEY=VALUE arguments into a JSON object
fn parse_args_to_json(args: &[String]) -> Result<Value> {
    let mut obj = serde_json::Map::new();

    for arg in args {
        let (key, value) = arg.split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Invalid argument format: '{}'. Expected KEY=VALUE", arg))?;

        // Try to parse value as JSON, fall back to string
        let json_value: Value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));

        obj.insert(key.to_string(), json_value);
    }

    Ok(Value::Object(obj))
}

/// Merge two JSON objects (overlay wins)
fn merge_json(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_obj), Value::Object(overlay_obj)) => {
            base_obj.extend(overlay_obj);
            Value::Object(base_obj)
        }
        (_, overlay) => overlay,
    }
}
