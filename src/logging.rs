//! Tracing/logging configuration
//!
//! Supports:
//! - Verbosity levels: default (WARN), verbose (INFO), debug (DEBUG), quiet (ERROR), silent (off)
//! - Pretty (colored), JSON or compact output formats
//! - File logging at DEBUG level while terminal shows configured level
//!
//! Terminal output always goes to stderr: stdout carries the MCP JSON-RPC stream.

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer, Registry,
};

/// Crate target used in filter directives
const LOG_TARGET: &str = "coinrailz_mcp";

/// Log output format
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored human-readable output
    #[default]
    Pretty,
    /// Structured JSON output (one JSON object per line)
    Json,
    /// Compact single-line format
    Compact,
}

/// Tracing configuration built from CLI args
#[derive(Default)]
pub struct TracingConfig {
    /// Verbose mode (INFO level)
    pub verbose: bool,
    /// Debug mode (DEBUG level)
    pub debug: bool,
    /// Quiet mode (ERROR only)
    pub quiet: bool,
    /// Silent mode (no terminal output)
    pub silent: bool,
    /// Output format
    pub format: LogFormat,
    /// Optional log file path (writes DEBUG+ regardless of terminal level)
    pub log_file: Option<PathBuf>,
}

impl TracingConfig {
    /// Terminal level, or None when silent
    fn terminal_level(&self) -> Option<Level> {
        if self.silent {
            None
        } else if self.quiet {
            Some(Level::ERROR)
        } else if self.debug {
            Some(Level::DEBUG)
        } else if self.verbose {
            Some(Level::INFO)
        } else {
            Some(Level::WARN)
        }
    }

    fn cli_level_specified(&self) -> bool {
        self.verbose || self.debug || self.quiet || self.silent
    }
}

/// Global flag to track if tracing has been initialized
static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Boxed layer type alias for Registry
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Filter directive for a given level
fn directive(level: Level) -> String {
    format!("{}={},warn", LOG_TARGET, level.as_str().to_lowercase())
}

/// CLI args take precedence over RUST_LOG
fn make_filter(level: Level, cli_specified: bool) -> EnvFilter {
    if cli_specified {
        EnvFilter::new(directive(level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(level)))
    }
}

/// Create a boxed terminal layer with the given format and filter
fn make_terminal_layer(format: &LogFormat, filter: EnvFilter) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(true)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

/// Initialize tracing with the given configuration.
///
/// If called multiple times, subsequent calls are ignored.
pub fn init_tracing(config: TracingConfig) {
    if TRACING_INITIALIZED.get().is_some() {
        return;
    }

    let cli_specified = config.cli_level_specified();
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if let Some(log_path) = &config.log_file {
        match std::fs::File::create(log_path) {
            Ok(file) => {
                let file_layer: BoxedLayer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(file)
                    .with_filter(EnvFilter::new(directive(Level::DEBUG)))
                    .boxed();
                layers.push(file_layer);
            }
            Err(e) => {
                // Fall through to terminal-only logging
                eprintln!("Warning: Failed to create log file {:?}: {}", log_path, e);
            }
        }
    }

    if let Some(level) = config.terminal_level() {
        layers.push(make_terminal_layer(&config.format, make_filter(level, cli_specified)));
    }

    if layers.is_empty() {
        // Silent mode with no file - install a no-op subscriber
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
    } else {
        let _ = tracing_subscriber::registry().with(layers).try_init();
    }

    let _ = TRACING_INITIALIZED.set(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_default() {
        let format = LogFormat::default();
        assert!(matches!(format, LogFormat::Pretty));
    }

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(!config.cli_level_specified());
        assert_eq!(config.terminal_level(), Some(Level::WARN));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_level_precedence() {
        let silent = TracingConfig { silent: true, ..Default::default() };
        assert_eq!(silent.terminal_level(), None);

        let quiet = TracingConfig { quiet: true, ..Default::default() };
        assert_eq!(quiet.terminal_level(), Some(Level::ERROR));

        let debug = TracingConfig { debug: true, ..Default::default() };
        assert_eq!(debug.terminal_level(), Some(Level::DEBUG));
    }

    #[test]
    fn test_directive() {
        assert_eq!(directive(Level::INFO), "coinrailz_mcp=info,warn");
    }
}
