//! Trial credential provisioning
//!
//! Requests a short-lived demo key for this installation. Network, status and
//! body problems all come back as `Ok(None)`; only failing to obtain the
//! installation id is an error.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{user_agent, GatewayConfig, SDK_TYPE};
use crate::credential::Credential;
use crate::identity::{IdentityError, IdentityStore};

/// Demo-key endpoint path relative to the base URL
pub const DEMO_KEY_PATH: &str = "/api/sdk/demo-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DemoKeyRequest<'a> {
    install_id: &'a str,
    sdk_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct DemoKeyResponse {
    #[serde(default)]
    api_key: Option<String>,
}

/// Client for the platform's demo-key endpoint
#[derive(Clone)]
pub struct TrialProvisioner {
    http: reqwest::Client,
    identity: Arc<IdentityStore>,
    endpoint: String,
    timeout: Duration,
}

impl TrialProvisioner {
    pub fn new(http: reqwest::Client, identity: Arc<IdentityStore>, config: &GatewayConfig) -> Self {
        Self {
            http,
            identity,
            endpoint: config.url(DEMO_KEY_PATH),
            timeout: config.trial_timeout,
        }
    }

    /// Ask the platform for a trial credential.
    ///
    /// Each call issues a fresh request and may return a different key.
    pub async fn request_trial_credential(&self) -> Result<Option<Credential>, IdentityError> {
        let install_id = self.identity.get_or_create().await?;

        match self.fetch(install_id.as_str()).await {
            Ok(credential) => Ok(credential),
            Err(e) => {
                tracing::debug!(error = %e, "Trial key request failed");
                Ok(None)
            }
        }
    }

    async fn fetch(&self, install_id: &str) -> Result<Option<Credential>, reqwest::Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("User-Agent", user_agent())
            .timeout(self.timeout)
            .json(&DemoKeyRequest {
                install_id,
                sdk_type: SDK_TYPE,
            })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(%status, "Trial key not granted");
            return Ok(None);
        }

        let body: DemoKeyResponse = response.json().await?;
        let credential = body
            .api_key
            .filter(|key| !key.trim().is_empty())
            .map(Credential::trial);

        if credential.is_none() {
            tracing::debug!("Trial key response carried no api_key");
        }
        Ok(credential)
    }
}
