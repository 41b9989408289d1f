//! x402 payment-aware service dispatch
//!
//! This module contains:
//! - 402 body parsing (advertised price)
//! - Call and outcome value types
//! - Trial credential provisioning
//! - The service gateway tying them together

pub mod gateway;
pub mod outcome;
pub mod trial;
pub mod types;

pub use gateway::{GatewayError, ServiceGateway};
pub use outcome::{
    is_free_tier, CallOutcome, HttpMethod, PaymentGuidance, ServiceCall, FREE_TIER_SERVICES,
};
pub use trial::TrialProvisioner;
pub use types::{price_from_body, PaymentRequiredResponse};
