pub mod call;
pub mod serve;
pub mod tools;

use anyhow::{Context, Result};

use crate::config::GatewayConfig;
use crate::identity::IdentityStore;

/// Get version string with build details
pub fn version(name: &str) -> String {
    let build_type = if cfg!(debug_assertions) { "debug" } else { "release" };
    let target_env = if cfg!(target_env = "gnu") { "gnu" }
        else if cfg!(target_env = "musl") { "musl" }
        else if cfg!(target_env = "msvc") { "msvc" }
        else { "unknown" };

    format!("{} {} {} {} {} {}",
        name,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH,
        std::env::consts::OS,
        target_env,
        build_type,
    )
}

/// Print the persisted installation id, creating it on first use
pub async fn install_id(config: &GatewayConfig) -> Result<()> {
    let store = IdentityStore::new(&config.config_dir);
    let id = store
        .get_or_create()
        .await
        .with_context(|| format!("Failed to resolve installation id in {}", config.config_dir.display()))?;

    println!("{}", id);
    tracing::debug!(path = %store.file_path().display(), "Installation id file");
    Ok(())
}

/// Output format for command results
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}
