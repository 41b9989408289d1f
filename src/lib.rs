// Library interface for coinrailz-mcp
// The binary and integration tests import these modules

pub mod cli;
pub mod config;
pub mod credential;
pub mod identity;
pub mod logging;
pub mod mcp;
pub mod telemetry;
pub mod x402;
