//! Call and outcome value types for the service gateway

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Services the platform exempts from payment.
///
/// Advertised to callers only; the gateway relies on the platform's own 402
/// decision and never special-cases these names when dispatching.
pub const FREE_TIER_SERVICES: &[&str] = &["gas-price-oracle", "token-metadata"];

/// Whether a service is advertised as free tier
pub fn is_free_tier(service: &str) -> bool {
    FREE_TIER_SERVICES.contains(&service)
}

/// Field added to a success body served with an auto-provisioned trial key
pub const TRIAL_NOTE_FIELD: &str = "_sdk_note";

pub const TRIAL_NOTE: &str =
    "Used auto-fetched demo key. Set COINRAILZ_API_KEY env var to use your own credits.";

const CREDITS_URL: &str = "https://coinrailz.com/credits";
const DEMO_KEY_REFERENCE: &str = "POST https://coinrailz.com/api/sdk/demo-key with your install ID";
const DOCS_URL: &str = "https://coinrailz.com/docs/sdk";

// ============================================================================
// Service Call
// ============================================================================

/// HTTP method used for dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// One logical invocation of a remote service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    /// Service identifier, appended to `/x402/`
    pub service: String,
    /// JSON payload (sent as `{}` when absent)
    pub payload: Option<Map<String, Value>>,
    pub method: HttpMethod,
}

impl ServiceCall {
    pub fn post(service: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            service: service.into(),
            payload: Some(payload),
            method: HttpMethod::Post,
        }
    }

    pub fn get(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            payload: None,
            method: HttpMethod::Get,
        }
    }

    /// Request body for POST dispatch
    pub fn body(&self) -> Value {
        Value::Object(self.payload.clone().unwrap_or_default())
    }
}

// ============================================================================
// Payment Guidance
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickFix {
    pub step_1: &'static str,
    pub step_2: &'static str,
    pub step_3: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdkInfo {
    pub get_demo_key: &'static str,
    pub credits_page: &'static str,
    pub documentation: &'static str,
}

/// Static next steps attached to every payment-required outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentGuidance {
    pub quick_fix: QuickFix,
    pub free_services: Vec<&'static str>,
    pub sdk_info: SdkInfo,
}

impl Default for PaymentGuidance {
    fn default() -> Self {
        Self {
            quick_fix: QuickFix {
                step_1: "Get FREE demo key: Run any free service first (gas-price-oracle, token-metadata)",
                step_2: "Or buy credits: https://coinrailz.com/credits ($10 minimum)",
                step_3: "Set env var: export COINRAILZ_API_KEY=your_key_here",
            },
            free_services: FREE_TIER_SERVICES.to_vec(),
            sdk_info: SdkInfo {
                get_demo_key: DEMO_KEY_REFERENCE,
                credits_page: CREDITS_URL,
                documentation: DOCS_URL,
            },
        }
    }
}

// ============================================================================
// Call Outcome
// ============================================================================

/// Normalized result of a gateway invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// 2xx response body
    Success { body: Value },

    /// The platform demanded payment and no usable credential was available
    PaymentRequired {
        price_usd: String,
        guidance: PaymentGuidance,
    },

    /// Network failure, timeout, malformed response or non-2xx status
    TransportError {
        status_code: Option<u16>,
        message: String,
    },
}

impl CallOutcome {
    pub fn payment_required(price_usd: impl Into<String>) -> Self {
        CallOutcome::PaymentRequired {
            price_usd: price_usd.into(),
            guidance: PaymentGuidance::default(),
        }
    }

    /// Success body annotated with the trial-key note
    pub fn trial_success(body: Value) -> Self {
        let body = match body {
            Value::Object(mut map) => {
                map.insert(TRIAL_NOTE_FIELD.to_string(), Value::String(TRIAL_NOTE.to_string()));
                Value::Object(map)
            }
            other => json!({ "result": other, TRIAL_NOTE_FIELD: TRIAL_NOTE }),
        };
        CallOutcome::Success { body }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    /// JSON presented to the calling agent
    pub fn to_tool_value(&self, service: &str) -> Value {
        match self {
            CallOutcome::Success { body } => body.clone(),
            CallOutcome::PaymentRequired { price_usd, guidance } => json!({
                "error": "Payment required",
                "service": service,
                "price_usd": price_usd,
                "message": format!("This service costs ${}. You need an API key with credits.", price_usd),
                "quick_fix": guidance.quick_fix,
                "free_services": guidance.free_services,
                "sdk_info": guidance.sdk_info,
            }),
            CallOutcome::TransportError { status_code: Some(code), message } => json!({
                "error": format!("HTTP {}", code),
                "message": message,
            }),
            CallOutcome::TransportError { status_code: None, message } => json!({
                "error": "Request failed",
                "message": message,
            }),
        }
    }
}
