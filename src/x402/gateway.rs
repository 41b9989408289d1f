//! Payment-aware service gateway
//!
//! Runs one logical service call:
//! - fires a `usage` signal without waiting on it
//! - dispatches with the currently held credential (if any)
//! - on 402 with no credential held, provisions a trial key and retries once
//! - folds every network, status and parsing failure into a [`CallOutcome`]

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::{user_agent, GatewayConfig};
use crate::credential::{Credential, CredentialSlot, API_KEY_HEADER};
use crate::identity::{IdentityError, IdentityStore};
use crate::telemetry::{UsageEvent, UsageReporter};

use super::outcome::{CallOutcome, HttpMethod, ServiceCall};
use super::trial::TrialProvisioner;
use super::types::{price_from_body, SERVICE_PATH_PREFIX};

/// Hard failures of the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Installation identity unavailable: {0}")]
    Identity(#[from] IdentityError),
}

/// Gateway instance, constructed once per process and shared by reference
pub struct ServiceGateway {
    config: GatewayConfig,
    http: reqwest::Client,
    identity: Arc<IdentityStore>,
    credentials: CredentialSlot,
    reporter: UsageReporter,
    provisioner: TrialProvisioner,
}

impl ServiceGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().build()?;
        let identity = Arc::new(IdentityStore::new(config.config_dir.clone()));
        let credentials = CredentialSlot::new(config.api_key.clone().map(Credential::configured));
        let reporter = UsageReporter::new(http.clone(), Arc::clone(&identity), &config);
        let provisioner = TrialProvisioner::new(http.clone(), Arc::clone(&identity), &config);

        tracing::debug!(?config, "Service gateway configured");

        Ok(Self {
            config,
            http,
            identity,
            credentials,
            reporter,
            provisioner,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    pub fn credentials(&self) -> &CredentialSlot {
        &self.credentials
    }

    /// Report the one-time install event (later calls are no-ops)
    pub fn announce_install(&self) -> Option<JoinHandle<()>> {
        self.reporter.report(UsageEvent::Install)
    }

    /// Dispatch URL for a service
    pub fn service_url(&self, service: &str) -> String {
        self.config.url(&format!("{}{}", SERVICE_PATH_PREFIX, service))
    }

    /// Invoke a remote service.
    ///
    /// Only a failure to read or persist the installation id (required for
    /// trial provisioning) is returned as `Err`.
    pub async fn invoke(&self, call: &ServiceCall) -> Result<CallOutcome, GatewayError> {
        // Detached: the result never depends on this task
        drop(self.reporter.report(UsageEvent::Usage));

        let url = self.service_url(&call.service);
        let credential = self.credentials.current().await;

        tracing::debug!(
            service = %call.service,
            method = %call.method,
            credential = ?credential.as_ref().map(Credential::source),
            "Dispatching service call"
        );

        let response = match self.dispatch(call, &url, credential.as_ref()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(service = %call.service, error = %e, "Service call failed");
                return Ok(CallOutcome::TransportError {
                    status_code: None,
                    message: describe_error(&e),
                });
            }
        };

        let status = response.status();
        tracing::debug!(service = %call.service, %status, "Service responded");

        if status == StatusCode::PAYMENT_REQUIRED {
            let body = response.bytes().await.unwrap_or_default();
            let price = price_from_body(&body);

            if credential.is_none() {
                if let Some(outcome) = self.retry_with_trial(call, &url).await? {
                    return Ok(outcome);
                }
            }

            tracing::info!(service = %call.service, price_usd = %price, "Payment required");
            return Ok(CallOutcome::payment_required(price));
        }

        if let Err(e) = response.error_for_status_ref() {
            return Ok(CallOutcome::TransportError {
                status_code: Some(status.as_u16()),
                message: e.to_string(),
            });
        }

        match response.json::<Value>().await {
            Ok(body) => Ok(CallOutcome::Success { body }),
            Err(e) => Ok(CallOutcome::TransportError {
                status_code: None,
                message: describe_error(&e),
            }),
        }
    }

    /// Provision a trial key and retry the call exactly once.
    ///
    /// Returns `None` when the caller should fall through to payment-required.
    async fn retry_with_trial(
        &self,
        call: &ServiceCall,
        url: &str,
    ) -> Result<Option<CallOutcome>, GatewayError> {
        let Some(trial) = self.provisioner.request_trial_credential().await? else {
            tracing::debug!(service = %call.service, "No trial key available");
            return Ok(None);
        };

        tracing::info!(service = %call.service, "Retrying with auto-fetched demo key");
        self.credentials.store(trial.clone()).await;

        let retry = match self.dispatch(call, url, Some(&trial)).await {
            Ok(retry) => retry,
            Err(e) => {
                tracing::debug!(service = %call.service, error = %e, "Retry failed");
                return Ok(None);
            }
        };

        let status = retry.status();
        if !status.is_success() {
            tracing::debug!(service = %call.service, %status, "Retry rejected");
            return Ok(None);
        }

        match retry.json::<Value>().await {
            Ok(body) => Ok(Some(CallOutcome::trial_success(body))),
            Err(e) => {
                tracing::debug!(service = %call.service, error = %e, "Retry body unreadable");
                Ok(None)
            }
        }
    }

    async fn dispatch(
        &self,
        call: &ServiceCall,
        url: &str,
        credential: Option<&Credential>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let request = match call.method {
            HttpMethod::Get => self.http.get(url),
            HttpMethod::Post => self.http.post(url),
        };

        let mut request = request
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, user_agent())
            .timeout(self.config.dispatch_timeout);

        if let Some(credential) = credential {
            request = request.header(API_KEY_HEADER, credential.secret());
        }

        if call.method == HttpMethod::Post {
            request = request.json(&call.body());
        }

        request.send().await
    }
}

/// Descriptive message for transport-level failures
fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("Request timed out: {}", e)
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_decode() {
        format!("Malformed response: {}", e)
    } else {
        format!("Request failed: {}", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialSource;
    use crate::x402::outcome::{TRIAL_NOTE, TRIAL_NOTE_FIELD};
    use crate::x402::trial::DEMO_KEY_PATH;
    use serde_json::{json, Map};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn gateway(server: &MockServer, dir: &std::path::Path, api_key: Option<&str>) -> ServiceGateway {
        let mut config = GatewayConfig::new(dir).with_base_url(&server.uri());
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        config.dispatch_timeout = Duration::from_millis(500);
        config.trial_timeout = Duration::from_millis(500);
        config.telemetry_timeout = Duration::from_millis(200);
        ServiceGateway::new(config).unwrap()
    }

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    fn payment_required_body(price: &str) -> ResponseTemplate {
        ResponseTemplate::new(402).set_body_json(json!({
            "x402Version": 1,
            "accepts": [{"maxAmountRequiredUSD": price, "network": "base"}]
        }))
    }

    async fn service_requests(server: &MockServer, service: &str) -> Vec<Request> {
        let wanted = format!("{}{}", SERVICE_PATH_PREFIX, service);
        server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.url.path() == wanted)
            .collect()
    }

    #[tokio::test]
    async fn test_free_tier_success_without_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/gas-price-oracle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ethereum": {"gwei": 12}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "unused"})))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let call = ServiceCall::post("gas-price-oracle", payload(json!({"chains": ["ethereum"]})));

        let outcome = gw.invoke(&call).await.unwrap();
        assert_eq!(outcome, CallOutcome::Success { body: json!({"ethereum": {"gwei": 12}}) });

        let requests = service_requests(&server, "gas-price-oracle").await;
        assert!(requests[0].headers.get(API_KEY_HEADER).is_none());
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent, json!({"chains": ["ethereum"]}));
    }

    #[tokio::test]
    async fn test_configured_credential_never_provisions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/whale-alerts"))
            .and(header(API_KEY_HEADER, "user-key"))
            .respond_with(payment_required_body("0.35"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "unused"})))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), Some("user-key"));
        let outcome = gw.invoke(&ServiceCall::post("whale-alerts", Map::new())).await.unwrap();

        assert_eq!(outcome, CallOutcome::payment_required("0.35"));
        assert_eq!(gw.credentials().current().await.unwrap().source(), CredentialSource::Configured);
    }

    #[tokio::test]
    async fn test_trial_key_retry_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/trending-tokens"))
            .and(header(API_KEY_HEADER, "demo-key-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": ["PEPE"]})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/x402/trending-tokens"))
            .respond_with(payment_required_body("0.50"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "demo-key-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let call = ServiceCall::post("trending-tokens", payload(json!({"chain": "base", "limit": 10})));

        let outcome = gw.invoke(&call).await.unwrap();
        let CallOutcome::Success { body } = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(body["tokens"], json!(["PEPE"]));
        assert_eq!(body[TRIAL_NOTE_FIELD], TRIAL_NOTE);

        // The retry carried the provisioned key verbatim and the same payload
        let requests = service_requests(&server, "trending-tokens").await;
        assert_eq!(requests.len(), 2);
        assert!(requests[0].headers.get(API_KEY_HEADER).is_none());
        assert_eq!(requests[1].headers.get(API_KEY_HEADER).unwrap(), "demo-key-1");
        assert_eq!(requests[0].body, requests[1].body);

        let held = gw.credentials().current().await.unwrap();
        assert_eq!(held.secret(), "demo-key-1");
        assert_eq!(held.source(), CredentialSource::Trial);
    }

    #[tokio::test]
    async fn test_held_trial_key_used_on_next_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/token-price"))
            .and(header(API_KEY_HEADER, "demo-key-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"usd": 1.0})))
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/x402/token-price"))
            .respond_with(payment_required_body("0.15"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "demo-key-2"})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let call = ServiceCall::post("token-price", Map::new());

        assert!(gw.invoke(&call).await.unwrap().is_success());
        let second = gw.invoke(&call).await.unwrap();
        assert_eq!(second, CallOutcome::Success { body: json!({"usd": 1.0}) });
    }

    /// Hands out a distinct demo key per request
    struct SequentialKeys(AtomicUsize);

    impl Respond for SequentialKeys {
        fn respond(&self, _: &Request) -> ResponseTemplate {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(200).set_body_json(json!({"api_key": format!("k{}", n)}))
        }
    }

    /// Echoes the credential the request carried
    struct EchoKey;

    impl Respond for EchoKey {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let key = request.headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("");
            ResponseTemplate::new(200).set_body_json(json!({"key": key}))
        }
    }

    #[tokio::test]
    async fn test_concurrent_calls_retry_with_own_trial_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/sentiment-analysis"))
            .and(header_exists(API_KEY_HEADER))
            .respond_with(EchoKey)
            .with_priority(1)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/x402/sentiment-analysis"))
            .respond_with(payment_required_body("0.25").set_delay(Duration::from_millis(100)))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(SequentialKeys(AtomicUsize::new(0)))
            .expect(2)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let call = ServiceCall::post("sentiment-analysis", Map::new());

        let (first, second) = tokio::join!(gw.invoke(&call), gw.invoke(&call));
        let mut keys: Vec<String> = [first.unwrap(), second.unwrap()]
            .into_iter()
            .map(|outcome| match outcome {
                CallOutcome::Success { body } => body["key"].as_str().unwrap().to_string(),
                other => panic!("expected success, got {:?}", other),
            })
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["k0", "k1"]);

        // Last writer wins
        let held = gw.credentials().current().await.unwrap();
        assert!(keys.iter().any(|k| k == held.secret()));
        assert_eq!(held.source(), CredentialSource::Trial);
    }

    #[tokio::test]
    async fn test_provisioning_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/arbitrage-scanner"))
            .respond_with(payment_required_body("0.50"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("arbitrage-scanner", Map::new())).await.unwrap();

        let CallOutcome::PaymentRequired { price_usd, guidance } = outcome else {
            panic!("expected payment required, got {:?}", outcome);
        };
        assert_eq!(price_usd, "0.50");
        assert_eq!(guidance.free_services, vec!["gas-price-oracle", "token-metadata"]);
        assert!(gw.credentials().is_empty().await);
    }

    #[tokio::test]
    async fn test_second_402_does_not_provision_again() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/contract-scan"))
            .respond_with(payment_required_body("2.00"))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "demo-empty"})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("contract-scan", Map::new())).await.unwrap();
        assert_eq!(outcome, CallOutcome::payment_required("2.00"));
    }

    #[tokio::test]
    async fn test_retry_transport_failure_falls_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/wallet-risk"))
            .and(header(API_KEY_HEADER, "demo-slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/x402/wallet-risk"))
            .respond_with(payment_required_body("0.50"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "demo-slow"})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("wallet-risk", Map::new())).await.unwrap();
        assert_eq!(outcome, CallOutcome::payment_required("0.50"));
    }

    #[tokio::test]
    async fn test_malformed_402_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/risk-metrics"))
            .respond_with(ResponseTemplate::new(402).set_body_string("<html>pay up</html>"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(DEMO_KEY_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("risk-metrics", Map::new())).await.unwrap();
        assert_eq!(outcome, CallOutcome::payment_required("Unknown"));
    }

    #[tokio::test]
    async fn test_dispatch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/ping"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;
        // Telemetry endpoint is slow too; it must not influence the outcome
        Mock::given(method("POST"))
            .and(path("/api/sdk/telemetry"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("ping", Map::new())).await.unwrap();

        let CallOutcome::TransportError { status_code, message } = outcome else {
            panic!("expected transport error, got {:?}", outcome);
        };
        assert_eq!(status_code, None);
        assert!(message.starts_with("Request timed out"), "{}", message);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GatewayConfig::new(tmp.path()).with_base_url("http://127.0.0.1:9");
        let gw = ServiceGateway::new(config).unwrap();

        let outcome = gw.invoke(&ServiceCall::post("ping", Map::new())).await.unwrap();
        assert!(matches!(outcome, CallOutcome::TransportError { status_code: None, .. }));
    }

    #[tokio::test]
    async fn test_non_2xx_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/polymarket-odds"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("polymarket-odds", Map::new())).await.unwrap();

        let CallOutcome::TransportError { status_code, message } = outcome else {
            panic!("expected transport error, got {:?}", outcome);
        };
        assert_eq!(status_code, Some(500));
        assert!(message.contains("500"), "{}", message);
    }

    #[tokio::test]
    async fn test_success_with_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::post("ping", Map::new())).await.unwrap();
        assert!(matches!(outcome, CallOutcome::TransportError { status_code: None, .. }));
    }

    #[tokio::test]
    async fn test_get_sends_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x402/ping"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        let outcome = gw.invoke(&ServiceCall::get("ping")).await.unwrap();
        assert!(outcome.is_success());

        let requests = service_requests(&server, "ping").await;
        assert!(requests[0].body.is_empty());
        assert_eq!(
            requests[0].headers.get("User-Agent").unwrap(),
            user_agent().as_str()
        );
    }

    #[tokio::test]
    async fn test_usage_reported_per_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/sdk/telemetry"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let gw = gateway(&server, tmp.path(), None);
        for _ in 0..3 {
            gw.invoke(&ServiceCall::post("ping", Map::new())).await.unwrap();
        }
        gw.announce_install().unwrap().await.unwrap();
        assert!(gw.announce_install().is_none());

        // Detached usage reports land eventually
        let mut usage = 0;
        for _ in 0..50 {
            let requests = server.received_requests().await.unwrap();
            usage = requests
                .iter()
                .filter(|r| r.url.path() == "/api/sdk/telemetry")
                .filter(|r| serde_json::from_slice::<Value>(&r.body).map(|b| b["event"] == "usage").unwrap_or(false))
                .count();
            if usage == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(usage, 3);
    }

    #[tokio::test]
    async fn test_identity_failure_is_hard_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x402/token-sentiment"))
            .respond_with(payment_required_body("0.25"))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let gw = gateway(&server, &blocker.join("dir"), None);
        let result = gw.invoke(&ServiceCall::post("token-sentiment", Map::new())).await;
        assert!(matches!(result, Err(GatewayError::Identity(_))));
    }
}
