//! x402 wire types consumed by the gateway
//!
//! Only the parts of the payment-required body the gateway needs are modelled.
//! Parsing is lenient: anything unexpected degrades to [`UNKNOWN_PRICE`].

use serde::Deserialize;
use serde_json::Value;

/// Path prefix for service dispatch
pub const SERVICE_PATH_PREFIX: &str = "/x402/";

/// Price shown when the 402 body does not carry one
pub const UNKNOWN_PRICE: &str = "Unknown";

/// Body of an HTTP 402 response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRequiredResponse {
    #[serde(default)]
    pub accepts: Vec<Value>,
}

impl PaymentRequiredResponse {
    /// Human price of the first accepted payment option
    pub fn price_usd(&self) -> Option<String> {
        let amount = self.accepts.first()?.get("maxAmountRequiredUSD")?;
        match amount {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Extract the advertised USD price from a raw 402 body
pub fn price_from_body(body: &[u8]) -> String {
    serde_json::from_slice::<PaymentRequiredResponse>(body)
        .ok()
        .and_then(|resp| resp.price_usd())
        .unwrap_or_else(|| UNKNOWN_PRICE.to_string())
}
