use std::{fmt::Debug, sync::Arc};

use hpp_common::{helpers::truncate_chars, Money};
use log::*;
use url::Url;

use crate::{
    config::GatewayConfig,
    db::traits::{OrderManagement, OrderUpdate},
    db_types::{Address, GatewayMetadata, NewAuditEntry, NewOrder, Order, OrderId, OrderItem},
    helpers::{sign, Clock, IdGenerator, MerchantReference, RandomIdGenerator, SystemClock, SIGNATURE_FIELD},
    hpp_api::{
        errors::CheckoutError,
        order_objects::{CheckoutRequest, CheckoutResult},
    },
};

/// The gateway rejects descriptions longer than this.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const CHECKOUT_ACTOR: &str = "checkout";
const REDACTED: &str = "****";

/// `CheckoutApi` turns a buyer's cart into a pending order and a signed redirect to the hosted payment page.
///
/// It is the only code path that creates orders.
pub struct CheckoutApi<B> {
    db: B,
    config: Arc<GatewayConfig>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, config: Arc<GatewayConfig>) -> Self {
        Self { db, config, clock: Arc::new(SystemClock), ids: Arc::new(RandomIdGenerator) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl<B> CheckoutApi<B>
where B: OrderManagement
{
    /// Creates a pending order for the cart and builds the signed redirect URL for it.
    ///
    /// The request is validated before anything is written. If the gateway credentials are incomplete the order is
    /// still created (and an audit note explains why it has no payment link), but a
    /// [`CheckoutError::ConfigurationError`] is returned instead of a URL.
    pub async fn create_checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, CheckoutError> {
        validate_request(&request)?;
        let now = self.clock.now();
        let id = self.ids.next_id();
        let description = request.description.clone().unwrap_or_else(|| format!("Order {id}"));
        let shipping_address = normalize_address(request.shipping_address);
        let billing_address = request.billing_address.map(normalize_address).unwrap_or_else(|| shipping_address.clone());
        let items = request
            .items
            .into_iter()
            .map(|i| OrderItem { product_id: i.product_id, quantity: i.quantity, unit_price: i.unit_price })
            .collect();
        let new_order = NewOrder::new(
            id.clone(),
            request.customer_id,
            request.buyer,
            items,
            request.tax,
            request.shipping,
            self.config.currency.clone(),
            self.config.gateway_name.clone(),
            shipping_address,
            billing_address,
            now,
        )
        .map_err(|e| CheckoutError::ValidationError(e.to_string()))?;
        let order = self.db.insert_order(new_order).await?;
        info!("💳️ Order [{id}] created for {} {}", order.total, order.currency);

        let missing = self.config.missing_settings();
        if !missing.is_empty() {
            warn!("💳️ Cannot issue a payment link for order [{id}]. Missing settings: {}", missing.join(", "));
            let note = format!("Payment link not issued: gateway settings missing ({})", missing.join(", "));
            self.db.append_audit_note(&id, NewAuditEntry::new(CHECKOUT_ACTOR, note, now)).await?;
            return Err(CheckoutError::ConfigurationError { order_id: id, missing });
        }

        let reference = MerchantReference::for_order(&self.config.reference_prefix, &id, now);
        let mut params = payment_params(&self.config, &order, &reference, &description);
        let signature = sign(params.iter().map(|(k, v)| (*k, v.as_str())), &self.config.signature_secret())
            .map_err(|e| CheckoutError::SignatureError(e.to_string()))?;
        params.push((SIGNATURE_FIELD, signature));
        let redirect_url = Url::parse_with_params(&self.config.gateway_url, params.iter().map(|(k, v)| (*k, v)))
            .map_err(|e| {
                warn!("💳️ The configured gateway URL is invalid: {e}");
                CheckoutError::InvalidGatewayUrl { order_id: id.clone() }
            })?;

        let gateway = GatewayMetadata {
            merchant_reference: Some(reference.encode()),
            request_params: redacted_params(&params),
            ..order.gateway.clone()
        };
        let audit = NewAuditEntry::new(CHECKOUT_ACTOR, format!("Payment request issued with reference {reference}"), now);
        let order = self.db.update_order(&id, order.version, OrderUpdate::default().with_gateway(gateway), audit).await?;
        debug!("💳️ Payment request for order [{id}] issued with reference {reference}");
        Ok(CheckoutResult { order, redirect_url: redirect_url.to_string() })
    }

    /// Read-only lookup for the buyer-facing result pages. The outcome in the return URL is only what the buyer's
    /// browser claims, so those pages report the stored status instead.
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, CheckoutError> {
        Ok(self.db.fetch_order(id).await?)
    }
}

fn validate_request(request: &CheckoutRequest) -> Result<(), CheckoutError> {
    let invalid = |msg: String| Err(CheckoutError::ValidationError(msg));
    if request.items.is_empty() {
        return invalid("The cart is empty".into());
    }
    for item in &request.items {
        if item.product_id.trim().is_empty() {
            return invalid("Every cart item needs a product id".into());
        }
        if item.quantity < 1 {
            return invalid(format!("Quantity for product {} must be at least 1", item.product_id));
        }
        if item.unit_price.is_negative() {
            return invalid(format!("Price for product {} cannot be negative", item.product_id));
        }
    }
    if request.tax.is_negative() || request.shipping.is_negative() {
        return invalid("Tax and shipping cannot be negative".into());
    }
    if request.buyer.first_name.trim().is_empty() || request.buyer.last_name.trim().is_empty() {
        return invalid("Buyer first and last name are required".into());
    }
    if !request.buyer.email.contains('@') {
        return invalid(format!("'{}' is not a valid email address", request.buyer.email));
    }
    validate_address("shipping", &request.shipping_address)?;
    if let Some(billing) = &request.billing_address {
        validate_address("billing", billing)?;
    }
    Ok(())
}

fn validate_address(kind: &str, address: &Address) -> Result<(), CheckoutError> {
    if address.line1.trim().is_empty() || address.city.trim().is_empty() {
        return Err(CheckoutError::ValidationError(format!("The {kind} address needs a street and a city")));
    }
    let country = address.country.trim();
    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CheckoutError::ValidationError(format!(
            "The {kind} country must be a two-letter ISO 3166-1 code, not '{country}'"
        )));
    }
    Ok(())
}

fn normalize_address(mut address: Address) -> Address {
    address.country = address.country.trim().to_ascii_uppercase();
    address
}

/// The outbound parameters in the order the gateway documents them. The signature is appended by the caller.
fn payment_params(
    config: &GatewayConfig,
    order: &Order,
    reference: &MerchantReference,
    description: &str,
) -> Vec<(&'static str, String)> {
    let amount: Money = order.total;
    let billing = &order.billing_address;
    vec![
        ("ivp_method", "create".to_string()),
        ("ivp_store", config.merchant_id.clone()),
        ("ivp_authkey", config.api_key.reveal().clone()),
        ("ivp_cart", reference.encode()),
        ("ivp_test", if config.test_mode { "1" } else { "0" }.to_string()),
        ("ivp_amount", amount.to_string()),
        ("ivp_currency", order.currency.clone()),
        ("ivp_desc", truncate_chars(description, MAX_DESCRIPTION_LENGTH).to_string()),
        ("return_auth", config.return_url("success", order.id.as_str())),
        ("return_can", config.return_url("cancelled", order.id.as_str())),
        ("return_decl", config.return_url("declined", order.id.as_str())),
        ("bill_fname", order.buyer.first_name.clone()),
        ("bill_sname", order.buyer.last_name.clone()),
        ("bill_email", order.buyer.email.clone()),
        ("bill_addr1", billing.line1.clone()),
        ("bill_city", billing.city.clone()),
        ("bill_country", billing.country.clone()),
        ("bill_tel", order.buyer.phone.clone()),
    ]
}

fn redacted_params(params: &[(&'static str, String)]) -> std::collections::BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| {
            let value = if *k == "ivp_authkey" { REDACTED.to_string() } else { v.clone() };
            (k.to_string(), value)
        })
        .collect()
}
