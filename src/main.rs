use anyhow::Result;
use clap::{Parser, Subcommand};

use coinrailz_mcp::{cli, config};

#[derive(Parser)]
#[command(name = "coinrailz-mcp")]
#[command(about = "Coin Railz x402 MCP server - crypto data and trading services as MCP tools")]
#[command(long_about = "\
Coin Railz x402 MCP server

Exposes the Coin Railz x402 micropayment services as MCP tools over stdio.
Paid services use your API key (COINRAILZ_API_KEY) when set. Without one, the
first payment-gated call auto-fetches a demo key with trial credits.
gas-price-oracle and token-metadata are free.

TYPICAL WORKFLOWS:

  Claude Desktop / MCP clients:
    coinrailz-mcp                     # Serve over stdio (same as `serve`)

  From a shell:
    coinrailz-mcp tools               # List tools with prices
    coinrailz-mcp call get_gas_prices -a 'chains=[\"base\"]'
    coinrailz-mcp install-id          # Show the anonymous installation id

For more details on each command, use: coinrailz-mcp <command> --help
")]
struct Cli {
    /// Global configuration arguments
    #[command(flatten)]
    config: config::ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdio (default)
    ///
    ///  - Reads JSON-RPC requests from stdin and writes responses to stdout.
    ///
    ///  - Logs go to stderr.
    ///
    /// Example:
    ///
    ///  $ coinrailz-mcp serve
    ///
    ///  $ COINRAILZ_API_KEY=... coinrailz-mcp serve -v
    ///
    Serve(cli::serve::ServeArgs),

    /// Call a single tool and print its result
    ///
    /// Example:
    ///
    ///  $ coinrailz-mcp call get_token_price -a token_address=0x... -a chain=base
    ///
    ///  $ coinrailz-mcp call analyze_lease --input '{"lease_terms": {"rent": 4200}}'
    ///
    Call(cli::call::CallArgs),

    /// List available tools with prices
    ///
    /// Example:
    ///
    ///  $ coinrailz-mcp tools --category trading
    ///
    ///  $ coinrailz-mcp tools -o json
    ///
    Tools(cli::tools::ToolsArgs),

    /// Print the persisted installation id
    InstallId,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before any logging calls
    cli.config.init_tracing();

    tracing::debug!("coinrailz-mcp starting");

    match cli.command.unwrap_or(Commands::Serve(Default::default())) {
        Commands::Serve(args) => cli::serve::run(args, cli.config.to_gateway_config()?).await?,
        Commands::Call(args) => cli::call::run(args, cli.config.to_gateway_config()?).await?,
        Commands::Tools(args) => cli::tools::run(args)?,
        Commands::InstallId => cli::install_id(&cli.config.to_gateway_config()?).await?,
        Commands::Version => println!("{}", cli::version("coinrailz-mcp")),
    }

    tracing::debug!("coinrailz-mcp shutting down");
    Ok(())
}
