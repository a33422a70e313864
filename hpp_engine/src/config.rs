//! Payment gateway connection settings.
//!
//! The configuration is read once at start-up and shared, immutable, with the checkout and webhook APIs. Nothing in
//! the engine reads credentials from the environment after that.
//!
//! | Variable                    | Default                                     |
//! |-----------------------------|---------------------------------------------|
//! | `HPP_GATEWAY_MERCHANT_ID`   | (none)                                      |
//! | `HPP_GATEWAY_API_KEY`       | (none)                                      |
//! | `HPP_GATEWAY_API_PASSWORD`  | (none)                                      |
//! | `HPP_GATEWAY_URL`           | `https://secure.telr.com/gateway/order.json`|
//! | `HPP_PUBLIC_BASE_URL`       | `http://127.0.0.1:8370`                     |
//! | `HPP_GATEWAY_CURRENCY`      | `AED`                                       |
//! | `HPP_GATEWAY_NAME`          | `hosted_payment_page`                       |
//! | `HPP_REFERENCE_PREFIX`      | `HPP`                                       |
//! | `HPP_ENVIRONMENT`           | `development` (test mode on)                |
use std::env;

use hpp_common::{Secret, DEFAULT_CURRENCY_CODE};
use log::*;

use crate::helpers::signature::SignatureSecret;

pub const DEFAULT_GATEWAY_URL: &str = "https://secure.telr.com/gateway/order.json";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8370";
pub const DEFAULT_GATEWAY_NAME: &str = "hosted_payment_page";
pub const DEFAULT_REFERENCE_PREFIX: &str = "HPP";

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub merchant_id: String,
    pub api_key: Secret<String>,
    pub api_password: Secret<String>,
    /// Base URL of the hosted payment page. The signed parameters are appended as the query string.
    pub gateway_url: String,
    /// The externally reachable base URL of this server, used to build the return URLs.
    pub public_base_url: String,
    pub currency: String,
    /// Recorded as the order's payment method.
    pub gateway_name: String,
    pub reference_prefix: String,
    /// Sent to the gateway as `ivp_test=1`. Anything other than a production deployment runs in test mode.
    pub test_mode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::default(),
            api_key: Secret::default(),
            api_password: Secret::default(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            gateway_name: DEFAULT_GATEWAY_NAME.to_string(),
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
            test_mode: true,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let merchant_id = env::var("HPP_GATEWAY_MERCHANT_ID").ok().unwrap_or_else(|| {
            error!("🪛️ HPP_GATEWAY_MERCHANT_ID is not set. Checkout will fail until it is configured.");
            String::default()
        });
        let api_key = env::var("HPP_GATEWAY_API_KEY").ok().unwrap_or_else(|| {
            error!("🪛️ HPP_GATEWAY_API_KEY is not set. Checkout and callbacks will fail until it is configured.");
            String::default()
        });
        let api_password = env::var("HPP_GATEWAY_API_PASSWORD").ok().unwrap_or_else(|| {
            error!("🪛️ HPP_GATEWAY_API_PASSWORD is not set. Checkout and callbacks will fail until it is configured.");
            String::default()
        });
        let gateway_url = env::var("HPP_GATEWAY_URL").ok().unwrap_or_else(|| {
            info!("🪛️ HPP_GATEWAY_URL is not set. Using the default, {DEFAULT_GATEWAY_URL}");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let public_base_url = env::var("HPP_PUBLIC_BASE_URL")
            .ok()
            .unwrap_or_else(|| {
                warn!(
                    "🪛️ HPP_PUBLIC_BASE_URL is not set. Return URLs will point at {DEFAULT_PUBLIC_BASE_URL}, which the \
                     gateway cannot reach."
                );
                DEFAULT_PUBLIC_BASE_URL.to_string()
            })
            .trim_end_matches('/')
            .to_string();
        let currency = env::var("HPP_GATEWAY_CURRENCY")
            .map(|s| s.trim().to_uppercase())
            .ok()
            .filter(|s| s.len() == 3 && s.chars().all(|c| c.is_ascii_alphabetic()))
            .unwrap_or_else(|| {
                info!("🪛️ HPP_GATEWAY_CURRENCY is not set or invalid. Using {DEFAULT_CURRENCY_CODE}");
                DEFAULT_CURRENCY_CODE.to_string()
            });
        let gateway_name = env::var("HPP_GATEWAY_NAME").ok().unwrap_or_else(|| DEFAULT_GATEWAY_NAME.to_string());
        let reference_prefix = env::var("HPP_REFERENCE_PREFIX")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REFERENCE_PREFIX.to_string());
        let test_mode = test_mode_for_environment(env::var("HPP_ENVIRONMENT").ok().as_deref());
        if test_mode {
            info!("🪛️ Gateway requests will be sent in test mode");
        }
        Self {
            merchant_id,
            api_key: Secret::new(api_key),
            api_password: Secret::new(api_password),
            gateway_url,
            public_base_url,
            currency,
            gateway_name,
            reference_prefix,
            test_mode,
        }
    }

    /// The names of the settings that must be supplied before a payment request can be signed. Values are never
    /// included, so the result is safe to put in an error message.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.merchant_id.trim().is_empty() {
            missing.push("HPP_GATEWAY_MERCHANT_ID");
        }
        if self.api_key.is_blank() {
            missing.push("HPP_GATEWAY_API_KEY");
        }
        if self.api_password.is_blank() {
            missing.push("HPP_GATEWAY_API_PASSWORD");
        }
        if self.gateway_url.trim().is_empty() {
            missing.push("HPP_GATEWAY_URL");
        }
        missing
    }

    /// True when both halves of the signing secret are present. Callback verification only needs these.
    pub fn can_verify_signatures(&self) -> bool {
        !self.api_key.is_blank() && !self.api_password.is_blank()
    }

    pub fn signature_secret(&self) -> SignatureSecret {
        SignatureSecret::new(self.api_key.clone(), self.api_password.clone())
    }

    /// `<public_base_url>/payment/<outcome>?order_id=<id>`
    pub fn return_url(&self, outcome: &str, order_id: &str) -> String {
        format!("{}/payment/{outcome}?order_id={order_id}", self.public_base_url.trim_end_matches('/'))
    }
}

fn test_mode_for_environment(environment: Option<&str>) -> bool {
    !matches!(environment.map(|s| s.trim().to_lowercase()).as_deref(), Some("production") | Some("live"))
}
