//! Configuration for the Coin Railz MCP server
//!
//! All inputs are read once at process start, from CLI flags with environment
//! variable fallbacks:
//! - `COINRAILZ_BASE_URL` - platform base URL override
//! - `COINRAILZ_API_KEY` - pre-supplied credential
//! - `COINRAILZ_CONFIG_DIR` - directory for the persisted installation id
//!
//! The resolved [`GatewayConfig`] is handed to the service gateway and never
//! re-read afterwards.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::identity::default_config_dir;
use crate::logging::LogFormat;

/// Default platform base URL
pub const DEFAULT_BASE_URL: &str = "https://coinrailz.com";

/// SDK type tag sent with telemetry and trial provisioning
pub const SDK_TYPE: &str = "rust-mcp";

/// SDK version tag
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Telemetry request timeout
pub const TELEMETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Trial provisioning request timeout
pub const TRIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Service dispatch timeout (applies to the initial call and its retry separately)
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// `User-Agent` header value for every outgoing request
pub fn user_agent() -> String {
    format!("CoinRailz-MCP-Server/{}", SDK_VERSION)
}

// ============================================================================
// Configuration Arguments
// ============================================================================

/// Common configuration arguments (shared by all subcommands)
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Coin Railz platform base URL
    #[arg(long, env = "COINRAILZ_BASE_URL", value_name = "http(s)://...")]
    pub base_url: Option<String>,

    /// API key with prepaid credits.
    ///
    /// Without one, paid services auto-fetch a demo key with trial credits.
    ///
    #[arg(long, env = "COINRAILZ_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Directory holding the persisted installation id (default: ~/.coinrailz)
    #[arg(long, env = "COINRAILZ_CONFIG_DIR", value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Logging/Tracing Options
    // -------------------------------------------------------------------------

    /// Enable verbose output (INFO level logging)
    ///
    /// Default is WARN level. Use -v for INFO, -d for DEBUG.
    ///
    #[arg(short = 'v', long, env = "COINRAILZ_VERBOSE")]
    pub verbose: bool,

    /// Enable debug output (DEBUG level logging)
    #[arg(short = 'd', long, env = "COINRAILZ_DEBUG", conflicts_with = "verbose")]
    pub debug: bool,

    /// Quiet mode - only show errors
    #[arg(short = 'q', long, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// Silent mode - suppress all terminal log output
    ///
    /// Log file output (if configured) is unaffected.
    ///
    #[arg(long, short = 's', conflicts_with_all = ["verbose", "debug", "quiet"])]
    pub silent: bool,

    /// Log output format
    #[arg(long, short = 'L', default_value = "pretty", value_enum, env = "COINRAILZ_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Write debug logs to file
    #[arg(long, short = 'l', env = "COINRAILZ_LOG_FILE", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Initialize tracing/logging from these arguments.
    ///
    /// Call once early in main() before any logging calls.
    pub fn init_tracing(&self) {
        crate::logging::init_tracing(crate::logging::TracingConfig {
            verbose: self.verbose,
            debug: self.debug,
            quiet: self.quiet,
            silent: self.silent,
            format: self.log_format.clone(),
            log_file: self.log_file.clone(),
        });
    }

    /// Resolve into a gateway configuration
    pub fn to_gateway_config(&self) -> Result<GatewayConfig> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => default_config_dir()?,
        };

        let mut config = GatewayConfig::new(config_dir);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(api_key) = &self.api_key {
            config = config.with_api_key(api_key);
        }
        Ok(config)
    }
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Resolved configuration for the service gateway and its collaborators
#[derive(Clone)]
pub struct GatewayConfig {
    /// Platform base URL without trailing slash
    pub base_url: String,

    /// Pre-supplied credential (None if not configured)
    pub api_key: Option<String>,

    /// Directory for the installation id file
    pub config_dir: PathBuf,

    pub telemetry_timeout: Duration,
    pub trial_timeout: Duration,
    pub dispatch_timeout: Duration,
}

impl GatewayConfig {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            config_dir: config_dir.into(),
            telemetry_timeout: TELEMETRY_TIMEOUT,
            trial_timeout: TRIAL_TIMEOUT,
            dispatch_timeout: DISPATCH_TIMEOUT,
        }
    }

    /// Override the base URL (trailing slashes are stripped)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Set the pre-supplied credential (blank values count as absent)
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        let api_key = api_key.trim();
        self.api_key = (!api_key.is_empty()).then(|| api_key.to_string());
        self
    }

    /// Whether a credential was configured at startup
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build a platform URL from a path relative to the base
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.has_api_key())
            .field("config_dir", &self.config_dir)
            .field("telemetry_timeout", &self.telemetry_timeout)
            .field("trial_timeout", &self.trial_timeout)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish()
    }
}
