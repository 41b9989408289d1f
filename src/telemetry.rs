//! Best-effort anonymous usage reporting
//!
//! Each report is sent from a detached task so the caller never waits on it.
//! Failures of any kind (identity, transport, timeout, non-2xx) are logged at
//! debug level and dropped. The `install` event is sent at most once per
//! process; `usage` events are unrestricted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::{user_agent, GatewayConfig, SDK_TYPE, SDK_VERSION};
use crate::identity::{IdentityError, IdentityStore};

/// Telemetry endpoint path relative to the base URL
pub const TELEMETRY_PATH: &str = "/api/sdk/telemetry";

/// Kind of usage signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageEvent {
    Install,
    Usage,
}

#[derive(Debug, thiserror::Error)]
enum TelemetryError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("telemetry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telemetry endpoint returned {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvironmentSnapshot {
    has_api_key: bool,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TelemetryPayload<'a> {
    install_id: &'a str,
    sdk_type: &'static str,
    sdk_version: &'static str,
    event: UsageEvent,
    environment: &'a EnvironmentSnapshot,
}

struct ReporterInner {
    http: reqwest::Client,
    identity: Arc<IdentityStore>,
    endpoint: String,
    environment: EnvironmentSnapshot,
    timeout: Duration,
    install_sent: AtomicBool,
}

impl ReporterInner {
    async fn send(&self, event: UsageEvent) -> Result<(), TelemetryError> {
        let install_id = self.identity.get_or_create().await?;
        let payload = TelemetryPayload {
            install_id: install_id.as_str(),
            sdk_type: SDK_TYPE,
            sdk_version: SDK_VERSION,
            event,
            environment: &self.environment,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("User-Agent", user_agent())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status(status));
        }
        Ok(())
    }
}

/// Fire-and-forget usage reporter (cheap to clone)
#[derive(Clone)]
pub struct UsageReporter {
    inner: Arc<ReporterInner>,
}

impl UsageReporter {
    pub fn new(http: reqwest::Client, identity: Arc<IdentityStore>, config: &GatewayConfig) -> Self {
        Self {
            inner: Arc::new(ReporterInner {
                http,
                identity,
                endpoint: config.url(TELEMETRY_PATH),
                environment: EnvironmentSnapshot {
                    has_api_key: config.has_api_key(),
                    base_url: config.base_url.clone(),
                },
                timeout: config.telemetry_timeout,
                install_sent: AtomicBool::new(false),
            }),
        }
    }

    /// Dispatch a usage signal on a detached task.
    ///
    /// Returns `None` when the event was deduplicated. The handle may be
    /// dropped; the task completes (or times out) on its own.
    pub fn report(&self, event: UsageEvent) -> Option<JoinHandle<()>> {
        if event == UsageEvent::Install && self.inner.install_sent.swap(true, Ordering::SeqCst) {
            tracing::trace!("Install event already reported");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            match inner.send(event).await {
                Ok(()) => tracing::trace!(?event, "Telemetry sent"),
                Err(e) => tracing::debug!(?event, error = %e, "Telemetry dropped"),
            }
        }))
    }
}
